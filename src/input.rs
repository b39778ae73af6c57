use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Table,
    Text,
    Search,
    Menu,
    Choice,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Left,
    Right,
    Refresh,
    StartSearch,
    ToggleMenu,
    Navigate(char),
    Submit,
    Cancel,
    InputChar(char),
    Backspace,
    Pick(char),
    ToggleButton,
    ConfirmYes,
    ConfirmNo,
}

pub fn is_interrupt(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'))
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Table => map_table_key(key),
        InputMode::Text => map_text_key(key),
        InputMode::Search => map_search_key(key),
        InputMode::Menu => map_menu_key(key),
        InputMode::Choice => map_choice_key(key),
        InputMode::Confirm => map_confirm_key(key),
    }
}

fn map_movement_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('g') if key.modifiers.is_empty() => Some(Action::Top),
        KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::End => Some(Action::Bottom),
        _ => None,
    }
}

fn map_table_key(key: KeyEvent) -> Option<Action> {
    if let Some(action) = map_movement_key(key) {
        return Some(action);
    }
    match key.code {
        KeyCode::Char('q') if key.modifiers.is_empty() => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Left => Some(Action::Left),
        KeyCode::Char('h') if key.modifiers.is_empty() => Some(Action::Left),
        KeyCode::Right => Some(Action::Right),
        KeyCode::Char('r') if key.modifiers.is_empty() => Some(Action::Refresh),
        KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('m') if key.modifiers.is_empty() => Some(Action::ToggleMenu),
        KeyCode::Char(c) if c.is_ascii_digit() && !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Navigate(c))
        }
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Action::Submit)
        }
        _ => None,
    }
}

fn map_text_key(key: KeyEvent) -> Option<Action> {
    if let Some(action) = map_movement_key(key) {
        return Some(action);
    }
    match key.code {
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('q') if key.modifiers.is_empty() => Some(Action::Back),
        _ => None,
    }
}

fn map_search_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Action::Submit)
        }
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_menu_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Char('m') if key.modifiers.is_empty() => Some(Action::Cancel),
        KeyCode::Char(c) if c.is_ascii_digit() => Some(Action::Navigate(c)),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Pick(c)),
        _ => None,
    }
}

fn map_choice_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down | KeyCode::Tab => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up | KeyCode::BackTab => Some(Action::Up),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Pick(c)),
        _ => None,
    }
}

fn map_confirm_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
            Some(Action::ToggleButton)
        }
        KeyCode::Char('h') | KeyCode::Char('l') => Some(Action::ToggleButton),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::ConfirmNo),
        KeyCode::Esc => Some(Action::ConfirmNo),
        KeyCode::Enter => Some(Action::Submit),
        _ => None,
    }
}
