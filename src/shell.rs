use crate::blade::Blade;
use crate::highlight::DEFAULT_STYLE;
use crate::input::{self, Action, InputMode};
use crate::model::{ActionDef, Command, ContainerPurpose, UiEvent};
use crate::nav::{
    Banner, ChoiceEffect, ChoiceItem, ChoiceList, Dialog, Layer, Navigator, Overlay, TextPage,
};
use crate::process::StreamHandle;
use crate::scheduler::Scheduler;
use crate::view::{SelectionMemory, TableView, ViewHandle, ViewSpec};
use crossterm::event::KeyEvent;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PAGE_STEP: isize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Unpopulated,
    Populated,
    ErrorOverlay,
    MenuOverlay,
    SearchOverlay,
    DialogOverlay,
    TextPage,
    DrillDown,
}

pub struct Shell {
    blade: Blade,
    views: HashMap<String, TableView>,
    memory: SelectionMemory,
    nav: Navigator,
    scheduler: Scheduler,
    events: mpsc::UnboundedSender<UiEvent>,
    commands: Vec<Command>,
    status_delay: Duration,
    next_stream: u64,
    running: bool,
}

impl Shell {
    pub fn new(
        blade: Blade,
        events: mpsc::UnboundedSender<UiEvent>,
        cancel: CancellationToken,
        status_delay: Duration,
    ) -> Self {
        let root = blade.root().to_string();
        let mut shell = Self {
            blade,
            views: HashMap::new(),
            memory: SelectionMemory::default(),
            nav: Navigator::new(&root),
            scheduler: Scheduler::new(cancel),
            events,
            commands: Vec::new(),
            status_delay,
            next_stream: 0,
            running: true,
        };
        shell.open_page(&root);
        shell
    }

    pub fn blade(&self) -> &Blade {
        &self.blade
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    pub fn view(&self, kind: &str) -> Option<&TableView> {
        self.views.get(kind)
    }

    pub fn focused_view(&self) -> Option<&TableView> {
        self.nav
            .focused_table()
            .and_then(|kind| self.views.get(kind))
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        info!("quitting");
        self.running = false;
        self.scheduler.shutdown();
    }

    pub fn set_status_delay(&mut self, delay: Duration) {
        self.status_delay = delay;
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn next_stream_id(&mut self) -> u64 {
        self.next_stream += 1;
        self.next_stream
    }

    pub fn focus_state(&self) -> FocusState {
        if self.nav.banner().is_some_and(|banner| banner.is_error) {
            return FocusState::ErrorOverlay;
        }
        match self.nav.focused() {
            Some(Layer::Overlay(Overlay::Menu)) => FocusState::MenuOverlay,
            Some(Layer::Overlay(Overlay::Search { .. })) => FocusState::SearchOverlay,
            Some(Layer::Overlay(Overlay::Dialog { .. })) => FocusState::DialogOverlay,
            Some(Layer::Text(_)) => FocusState::TextPage,
            Some(Layer::Table { nested: true, .. }) => FocusState::DrillDown,
            Some(Layer::Table { kind, .. })
                if self.views.get(kind).is_some_and(TableView::is_populated) =>
            {
                FocusState::Populated
            }
            _ => FocusState::Unpopulated,
        }
    }

    pub fn open_page(&mut self, kind: &str) -> bool {
        if !self.views.contains_key(kind) {
            let Some(spec) = self.blade.view_spec(kind) else {
                warn!(kind, "no view registered for kind");
                return false;
            };
            self.install_view(spec);
        } else if !self.scheduler.is_attached(kind)
            && let Some(view) = self.views.get(kind)
        {
            warn!(kind, "refresh task gone, reattaching");
            self.scheduler.attach(view.core());
        }
        info!(page = kind, "switching page");
        self.nav.open(kind);
        self.scheduler.signal(kind);
        true
    }

    pub fn navigate(&mut self, key: char) -> bool {
        match self.blade.page_for_key(key).map(ToString::to_string) {
            Some(kind) => self.open_page(&kind),
            None => false,
        }
    }

    pub fn push_nested(&mut self, spec: ViewSpec) {
        let kind = spec.kind.kind().to_string();
        info!(kind = %kind, page = self.nav.current(), "drilling down");
        self.install_view(spec);
        let page = self.nav.current().to_string();
        self.nav.switch_page(&page, Layer::nested(&kind));
        self.scheduler.signal(&kind);
    }

    fn install_view(&mut self, spec: ViewSpec) {
        let view = TableView::new(spec, self.events.clone(), &self.memory);
        self.scheduler.attach(view.core());
        self.views.insert(view.kind().kind().to_string(), view);
    }

    pub fn refresh_focused(&mut self) -> bool {
        match self.nav.focused_table() {
            Some(kind) => self.scheduler.signal(kind),
            None => false,
        }
    }

    pub fn post_status(&mut self, message: &str, is_error: bool) {
        if is_error {
            warn!(message, "status");
        } else {
            debug!(message, "status");
        }
        self.nav.dismiss_banners();
        self.nav.push_banner(Banner {
            message: message.to_string(),
            is_error,
            expires_at: Instant::now() + self.status_delay,
        });
    }

    pub fn expire_banners(&mut self, now: Instant) -> bool {
        self.nav.expire_banners(now)
    }

    pub fn show_text(&mut self, title: &str, body: &str, style: Option<&str>) {
        let page = self.nav.current().to_string();
        let style = style.unwrap_or(DEFAULT_STYLE);
        self.nav.switch_page(
            &page,
            Layer::Text(TextPage::highlighted(title, body, style)),
        );
    }

    pub fn show_stream(&mut self, title: &str, handle: StreamHandle) {
        let page = self.nav.current().to_string();
        self.nav
            .switch_page(&page, Layer::Text(TextPage::streaming(title, handle)));
    }

    pub fn after_mutation(&mut self, label: &str) {
        self.nav.switch_to_root_page();
        let root = self.nav.current().to_string();
        self.scheduler.signal(&root);
        self.post_status(&format!("{label}: done"), false);
    }

    pub fn show_containers(&mut self, target: &str, purpose: ContainerPurpose, containers: Vec<String>) {
        if containers.is_empty() {
            self.post_status(&format!("no containers found for {target}"), true);
            return;
        }
        let items = containers
            .into_iter()
            .map(|container| ChoiceItem {
                label: container.clone(),
                description: String::new(),
                shortcut: None,
                effect: ChoiceEffect::Action {
                    name: purpose.action().to_string(),
                    argument: Some(container),
                },
            })
            .collect();
        self.nav.insert_dialog(
            "containers",
            Dialog::Choice(ChoiceList::new(format!("Containers of {target}"), items)),
        );
    }

    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Refreshed { kind } => debug!(kind = %kind, "repaint"),
            UiEvent::RefreshFailed { message, .. } => self.post_status(&message, true),
            UiEvent::LogLine { stream, line } => {
                if let Some(page) = self.nav.stream_page_mut(stream) {
                    let following = page.scroll + 1 >= page.body.len();
                    page.body.push(line);
                    if following {
                        page.scroll = page.body.len() - 1;
                    }
                }
            }
            UiEvent::LogEnded { stream, error } => {
                if self.nav.stream_page_mut(stream).is_none() {
                    return;
                }
                match error {
                    Some(error) => self.post_status(&error, true),
                    None => self.post_status("log stream ended", false),
                }
            }
        }
    }

    fn input_mode(&self) -> InputMode {
        match self.nav.focused() {
            Some(Layer::Text(_)) => InputMode::Text,
            Some(Layer::Overlay(Overlay::Menu)) => InputMode::Menu,
            Some(Layer::Overlay(Overlay::Search { .. })) => InputMode::Search,
            Some(Layer::Overlay(Overlay::Dialog {
                dialog: Dialog::Choice(_),
                ..
            })) => InputMode::Choice,
            Some(Layer::Overlay(Overlay::Dialog {
                dialog: Dialog::Confirm(_),
                ..
            })) => InputMode::Confirm,
            _ => InputMode::Table,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if input::is_interrupt(key) {
            self.quit();
            return;
        }

        let mode = self.input_mode();
        if mode == InputMode::Table && self.dispatch_to_handler(key) {
            return;
        }

        let Some(action) = input::map_key(mode, key) else {
            return;
        };
        debug!(?mode, ?action, "key");
        match mode {
            InputMode::Table => self.apply_table_action(action),
            InputMode::Text => self.apply_text_action(action),
            InputMode::Search => self.apply_search_action(action),
            InputMode::Menu => self.apply_menu_action(action),
            InputMode::Choice => self.apply_choice_action(action),
            InputMode::Confirm => self.apply_confirm_action(action),
        }
    }

    fn focused_kind(&self) -> Option<String> {
        self.nav.focused_table().map(ToString::to_string)
    }

    fn dispatch_to_handler(&mut self, key: KeyEvent) -> bool {
        let Some(kind) = self.focused_kind() else {
            return false;
        };
        let Some(handler) = self.views.get(&kind).map(TableView::handler) else {
            return false;
        };
        let mut handle = FocusedView { shell: self, kind };
        handler.on_key(key, &mut handle)
    }

    fn run_action(&mut self, action: &str, argument: Option<&str>) {
        let Some(kind) = self.focused_kind() else {
            return;
        };
        let Some(handler) = self.views.get(&kind).map(TableView::handler) else {
            return;
        };
        info!(kind = %kind, action, argument, "running action");
        let mut handle = FocusedView { shell: self, kind };
        handler.on_action(action, argument, &mut handle);
    }

    fn with_focused_view(&mut self, apply: impl FnOnce(&mut TableView, &mut SelectionMemory)) {
        if let Some(kind) = self.focused_kind()
            && let Some(view) = self.views.get_mut(&kind)
        {
            apply(view, &mut self.memory);
        }
    }

    fn show_search(&mut self) {
        let input = self
            .focused_view()
            .and_then(TableView::search)
            .unwrap_or_default()
            .to_string();
        self.nav.insert_overlay(Overlay::Search { input });
    }

    fn show_action_list(&mut self) {
        let Some(view) = self.focused_view() else {
            return;
        };
        if view.actions().is_empty() || view.selection_name().is_none() {
            return;
        }
        let title = format!("{} {}", view.kind().title(), view.selection_name().unwrap_or_default());
        let items = view
            .actions()
            .iter()
            .map(|action| ChoiceItem {
                label: action.name.to_string(),
                description: action.description.to_string(),
                shortcut: Some(action.shortcut),
                effect: ChoiceEffect::Action {
                    name: action.name.to_string(),
                    argument: None,
                },
            })
            .collect();
        self.nav
            .insert_dialog("actions", Dialog::Choice(ChoiceList::new(title, items)));
    }

    fn apply_table_action(&mut self, action: Action) {
        match action {
            Action::Quit if self.nav.depth() > 1 => self.nav.switch_to_root_page(),
            Action::Quit => self.quit(),
            Action::Back => {
                if !self.nav.escape() {
                    self.nav.dismiss_banners();
                }
            }
            Action::Down => self.with_focused_view(|view, memory| view.move_selection(1, memory)),
            Action::Up => self.with_focused_view(|view, memory| view.move_selection(-1, memory)),
            Action::PageDown => {
                self.with_focused_view(|view, memory| view.move_selection(PAGE_STEP, memory))
            }
            Action::PageUp => {
                self.with_focused_view(|view, memory| view.move_selection(-PAGE_STEP, memory))
            }
            Action::Top => self.with_focused_view(|view, memory| view.select_edge(false, memory)),
            Action::Bottom => self.with_focused_view(|view, memory| view.select_edge(true, memory)),
            Action::Left => self.with_focused_view(|view, memory| view.move_column(-1, memory)),
            Action::Right => self.with_focused_view(|view, memory| view.move_column(1, memory)),
            Action::Refresh => {
                self.refresh_focused();
            }
            Action::StartSearch => self.show_search(),
            Action::ToggleMenu => {
                self.nav.toggle_menu();
            }
            Action::Navigate(key) => {
                self.navigate(key);
            }
            Action::Submit => self.show_action_list(),
            _ => {}
        }
    }

    fn apply_text_action(&mut self, action: Action) {
        if action == Action::Back {
            self.nav.back_page();
            return;
        }
        let Some(Layer::Text(page)) = self.nav.focused_mut() else {
            return;
        };
        match action {
            Action::Down => page.scroll_by(1),
            Action::Up => page.scroll_by(-1),
            Action::PageDown => page.scroll_by(PAGE_STEP),
            Action::PageUp => page.scroll_by(-PAGE_STEP),
            Action::Top => page.scroll_to(false),
            Action::Bottom => page.scroll_to(true),
            _ => {}
        }
    }

    fn apply_search_action(&mut self, action: Action) {
        let Some(Layer::Overlay(Overlay::Search { input })) = self.nav.focused_mut() else {
            return;
        };
        match action {
            Action::InputChar(c) => input.push(c),
            Action::Backspace => {
                input.pop();
            }
            Action::Submit => {
                let term = std::mem::take(input);
                self.nav.escape();
                self.with_focused_view(|view, memory| {
                    view.set_search(&term);
                    view.select(0, view.selection().column, memory);
                });
                self.refresh_focused();
            }
            Action::Cancel => {
                self.nav.escape();
            }
            _ => {}
        }
    }

    fn apply_menu_action(&mut self, action: Action) {
        match action {
            Action::Cancel => {
                self.nav.toggle_menu();
            }
            Action::Navigate(key) => {
                self.nav.toggle_menu();
                self.navigate(key);
            }
            Action::Pick(shortcut) => {
                let picked = self
                    .focused_view()
                    .and_then(|view| {
                        view.actions()
                            .iter()
                            .find(|action| action.shortcut == shortcut)
                    })
                    .map(|action| action.name);
                if let Some(name) = picked {
                    self.nav.toggle_menu();
                    self.run_action(name, None);
                }
            }
            _ => {}
        }
    }

    fn apply_choice_action(&mut self, action: Action) {
        let Some(Layer::Overlay(Overlay::Dialog {
            dialog: Dialog::Choice(list),
            ..
        })) = self.nav.focused_mut()
        else {
            return;
        };
        let chosen = match action {
            Action::Down => {
                list.move_by(1);
                None
            }
            Action::Up => {
                list.move_by(-1);
                None
            }
            Action::Pick(shortcut) => list
                .by_shortcut(shortcut)
                .and_then(|index| list.items.get(index))
                .map(|item| item.effect.clone()),
            Action::Submit => list.items.get(list.selected).map(|item| item.effect.clone()),
            Action::Cancel => {
                self.nav.escape();
                None
            }
            _ => None,
        };
        if let Some(effect) = chosen {
            self.nav.escape();
            match effect {
                ChoiceEffect::Command(command) => self.commands.push(command),
                ChoiceEffect::Action { name, argument } => {
                    self.run_action(&name, argument.as_deref())
                }
            }
        }
    }

    fn apply_confirm_action(&mut self, action: Action) {
        let Some(Layer::Overlay(Overlay::Dialog {
            dialog: Dialog::Confirm(confirm),
            ..
        })) = self.nav.focused_mut()
        else {
            return;
        };
        let confirmed = match action {
            Action::ToggleButton => {
                confirm.confirm_selected = !confirm.confirm_selected;
                return;
            }
            Action::ConfirmYes => true,
            Action::Submit => confirm.confirm_selected,
            Action::ConfirmNo | Action::Cancel => false,
            _ => return,
        };
        let command = confirm.on_confirm.clone();
        self.nav.escape();
        if confirmed {
            self.commands.push(command);
        }
    }
}

struct FocusedView<'a> {
    shell: &'a mut Shell,
    kind: String,
}

impl FocusedView<'_> {
    fn view(&self) -> Option<&TableView> {
        self.shell.views.get(&self.kind)
    }
}

impl ViewHandle for FocusedView<'_> {
    fn selection_name(&self) -> Option<String> {
        self.view()?.selection_name()
    }

    fn selected_cell(&self, column: usize) -> Option<String> {
        self.view()?.selected_cell(column)
    }

    fn header(&self) -> Vec<String> {
        self.view().map(TableView::header).unwrap_or_default()
    }

    fn resource_kind(&self) -> String {
        self.kind.clone()
    }

    fn current_page(&self) -> String {
        self.shell.nav.current().to_string()
    }

    fn actions(&self) -> Vec<ActionDef> {
        self.view()
            .map(|view| view.actions().to_vec())
            .unwrap_or_default()
    }

    fn switch_page(&mut self, page: &str, layer: Layer) {
        self.shell.nav.switch_page(page, layer);
    }

    fn insert_dialog(&mut self, name: &str, dialog: Dialog) {
        self.shell.nav.insert_dialog(name, dialog);
    }

    fn back_page(&mut self) {
        self.shell.nav.back_page();
    }

    fn switch_to_root_page(&mut self) {
        self.shell.nav.switch_to_root_page();
    }

    fn update_status(&mut self, message: &str, is_error: bool) {
        self.shell.post_status(message, is_error);
    }

    fn refresh(&mut self) {
        self.shell.scheduler.signal(&self.kind);
    }

    fn show_search(&mut self) {
        self.shell.show_search();
    }

    fn show_menu(&mut self) {
        self.shell.nav.toggle_menu();
    }

    fn navigate(&mut self, key: char) -> bool {
        self.shell.navigate(key)
    }

    fn push_nested(&mut self, spec: ViewSpec) {
        self.shell.push_nested(spec);
    }

    fn dispatch(&mut self, command: Command) {
        info!(kind = %self.kind, ?command, "dispatching command");
        self.shell.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{RefreshError, refresher};
    use crate::model::{Invocation, ResourceKind};
    use crate::nav::Confirm;
    use crate::view::EventHandler;
    use crate::view::tests::static_spec;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALPHA: &str = "NAME     STATUS\nfirst    ok\nsecond   ok\nthird    degraded\n";
    const BETA: &str = "NAME   PORT\nweb    80\n";

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn code(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn settle(shell: &mut Shell, rx: &mut mpsc::UnboundedReceiver<UiEvent>) {
        tokio::time::sleep(Duration::from_millis(30)).await;
        while let Ok(event) = rx.try_recv() {
            shell.handle_ui_event(event);
        }
    }

    fn two_page_shell() -> (Shell, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let blade = Blade::new("test", "alpha")
            .with_root_view('1', static_spec("alpha", ALPHA))
            .with_root_view('2', static_spec("beta", BETA));
        let shell = Shell::new(blade, tx, CancellationToken::new(), Duration::from_secs(1));
        (shell, rx)
    }

    #[tokio::test]
    async fn root_view_is_populated_in_background() {
        let (mut shell, mut rx) = two_page_shell();
        assert_eq!(shell.focus_state(), FocusState::Unpopulated);
        settle(&mut shell, &mut rx).await;
        assert_eq!(shell.focus_state(), FocusState::Populated);
        assert!(shell.view("beta").is_none());
    }

    #[tokio::test]
    async fn selection_survives_switching_kinds() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('j'));
        shell.handle_key(key('j'));

        shell.handle_key(key('2'));
        settle(&mut shell, &mut rx).await;
        assert_eq!(shell.nav().current(), "beta");
        assert_eq!(
            shell.focused_view().and_then(TableView::selection_name).as_deref(),
            Some("web")
        );

        shell.handle_key(key('1'));
        assert_eq!(shell.nav().current(), "alpha");
        assert_eq!(
            shell.focused_view().and_then(TableView::selection_name).as_deref(),
            Some("third")
        );
    }

    #[tokio::test]
    async fn rebuilt_drill_down_restores_remembered_selection() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.push_nested(static_spec("pods", ALPHA));
        settle(&mut shell, &mut rx).await;
        assert_eq!(shell.focus_state(), FocusState::DrillDown);
        shell.handle_key(key('G'));

        shell.handle_key(code(KeyCode::Esc));
        assert_eq!(shell.focus_state(), FocusState::Populated);

        shell.push_nested(static_spec("pods", ALPHA));
        settle(&mut shell, &mut rx).await;
        assert_eq!(
            shell.focused_view().and_then(TableView::selection_name).as_deref(),
            Some("third")
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_grid_and_posts_error_banner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let flaky = ViewSpec {
            kind: ResourceKind::new("Flaky", "flaky"),
            refresher: refresher(move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Ok(ALPHA.to_string())
                    } else {
                        Err(RefreshError::Command("server unavailable".to_string()))
                    }
                }
            }),
            actions: Vec::new(),
            handler: Arc::new(crate::view::tests::Inert),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let blade = Blade::new("test", "flaky").with_root_view('1', flaky);
        let mut shell = Shell::new(blade, tx, CancellationToken::new(), Duration::from_millis(50));
        settle(&mut shell, &mut rx).await;
        let before = shell.view("flaky").map(|view| view.core().source().data());

        shell.handle_key(key('r'));
        settle(&mut shell, &mut rx).await;

        assert_eq!(shell.focus_state(), FocusState::ErrorOverlay);
        assert_eq!(
            shell.nav().banner().map(|banner| banner.message.as_str()),
            Some("server unavailable")
        );
        assert_eq!(shell.view("flaky").map(|view| view.core().source().data()), before);

        shell.handle_key(key('j'));
        assert_eq!(
            shell.focused_view().map(|view| view.selection().row),
            Some(1)
        );

        assert!(shell.expire_banners(Instant::now() + Duration::from_millis(100)));
        assert_eq!(shell.focus_state(), FocusState::Populated);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn q_returns_to_root_then_quits() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.push_nested(static_spec("pods", BETA));
        shell.handle_key(key('q'));
        assert_eq!(shell.nav().depth(), 1);
        assert!(shell.running());
        shell.handle_key(key('q'));
        assert!(!shell.running());
    }

    #[tokio::test]
    async fn search_overlay_filters_rows() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('/'));
        assert_eq!(shell.focus_state(), FocusState::SearchOverlay);
        for c in "DEGR".chars() {
            shell.handle_key(key(c));
        }
        shell.handle_key(code(KeyCode::Enter));

        assert_eq!(shell.focus_state(), FocusState::Populated);
        let view = shell.focused_view().expect("focused view");
        assert_eq!(view.search(), Some("DEGR"));
        assert_eq!(view.selection_name().as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn menu_digits_navigate_and_escape_closes() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('m'));
        assert_eq!(shell.focus_state(), FocusState::MenuOverlay);
        shell.handle_key(code(KeyCode::Esc));
        assert_eq!(shell.focus_state(), FocusState::Populated);

        shell.handle_key(key('m'));
        shell.handle_key(key('2'));
        assert_eq!(shell.nav().current(), "beta");
        assert!(!shell.nav().has_overlay());
    }

    struct Deleter;

    impl EventHandler for Deleter {
        fn on_key(&self, key: KeyEvent, view: &mut dyn ViewHandle) -> bool {
            match key.code {
                KeyCode::Char('d') => {
                    self.on_action("delete", None, view);
                    true
                }
                _ => false,
            }
        }

        fn on_action(&self, action: &str, _argument: Option<&str>, view: &mut dyn ViewHandle) {
            if action != "delete" {
                return;
            }
            let Some(name) = view.selection_name() else {
                return;
            };
            let command = Command::Mutate {
                invocation: Invocation::new("rio").args(["rm", name.as_str()]),
                label: format!("delete {name}"),
            };
            view.insert_dialog(
                "delete",
                Dialog::Confirm(Confirm::new(format!("Delete {name}?"), "Delete", command)),
            );
        }
    }

    fn deleter_shell() -> (Shell, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut spec = static_spec("alpha", ALPHA);
        spec.handler = Arc::new(Deleter);
        spec.actions = vec![ActionDef::new("delete", 'd', "Delete the service")];
        let blade = Blade::new("test", "alpha").with_root_view('1', spec);
        let shell = Shell::new(blade, tx, CancellationToken::new(), Duration::from_secs(1));
        (shell, rx)
    }

    #[tokio::test]
    async fn confirmed_delete_dispatches_mutation() {
        let (mut shell, mut rx) = deleter_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('d'));
        assert_eq!(shell.focus_state(), FocusState::DialogOverlay);
        shell.handle_key(key('y'));

        assert_eq!(shell.focus_state(), FocusState::Populated);
        assert_eq!(
            shell.take_commands(),
            vec![Command::Mutate {
                invocation: Invocation::new("rio").args(["rm", "first"]),
                label: "delete first".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn cancelled_delete_dispatches_nothing() {
        let (mut shell, mut rx) = deleter_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('d'));
        shell.handle_key(code(KeyCode::Enter));
        assert!(shell.take_commands().is_empty());
        assert!(!shell.nav().has_overlay());
    }

    #[tokio::test]
    async fn enter_opens_action_list_routed_to_handler() {
        let (mut shell, mut rx) = deleter_shell();
        settle(&mut shell, &mut rx).await;
        shell.handle_key(key('j'));
        shell.handle_key(code(KeyCode::Enter));
        assert_eq!(shell.focus_state(), FocusState::DialogOverlay);
        shell.handle_key(code(KeyCode::Enter));

        assert!(matches!(
            shell.nav().focused(),
            Some(Layer::Overlay(Overlay::Dialog { name, dialog: Dialog::Confirm(confirm) }))
                if name == "delete" && confirm.prompt == "Delete second?"
        ));
    }

    #[tokio::test]
    async fn log_lines_follow_the_tail_of_a_stream_page() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        let stream = shell.next_stream_id();
        let handle = crate::process::follow(
            &Invocation::new("sh").arg("-c").arg("printf 'a\\nb\\nc\\n'"),
            stream,
            shell.events.clone(),
        )
        .expect("spawn");
        shell.show_stream("logs web", handle);
        tokio::time::sleep(Duration::from_millis(200)).await;
        settle(&mut shell, &mut rx).await;

        let Some(Layer::Text(page)) = shell.nav().focused() else {
            panic!("expected text page");
        };
        assert_eq!(page.body, vec!["a", "b", "c"]);
        assert_eq!(page.scroll, 2);
        assert_eq!(shell.nav().banner().map(|b| b.is_error), Some(false));

        shell.handle_key(key('q'));
        assert_eq!(shell.focus_state(), FocusState::Populated);
    }

    #[tokio::test]
    async fn mutation_returns_to_root_and_refreshes() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.push_nested(static_spec("pods", BETA));
        shell.show_text("inspect", "kind: Service", None);
        assert_eq!(shell.focus_state(), FocusState::TextPage);
        shell.after_mutation("delete web");
        assert_eq!(shell.nav().depth(), 1);
        assert_eq!(shell.focus_state(), FocusState::Populated);
    }

    #[tokio::test]
    async fn captured_text_is_highlighted_with_the_requested_style() {
        let (mut shell, mut rx) = two_page_shell();
        settle(&mut shell, &mut rx).await;
        shell.show_text("inspect", "{\"kind\":\"Service\"}", Some("base16-ocean.light"));
        let Some(Layer::Text(page)) = shell.nav().focused() else {
            panic!("expected a text page");
        };
        assert_eq!(page.body.first().map(String::as_str), Some("{"));
        let expected = crate::highlight::highlight(
            &page.body.join("\n"),
            crate::highlight::Format::Json,
            "base16-ocean.light",
        );
        assert_eq!(page.highlighted.as_ref(), Some(&expected));
    }
}
