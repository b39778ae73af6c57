use crate::highlight::{self, Highlighted};
use crate::model::Command;
use crate::process::StreamHandle;
use std::collections::HashMap;
use std::time::Instant;

pub enum Layer {
    Table { kind: String, nested: bool },
    Text(TextPage),
    Overlay(Overlay),
}

impl Layer {
    pub fn table(kind: &str) -> Self {
        Self::Table {
            kind: kind.to_string(),
            nested: false,
        }
    }

    pub fn nested(kind: &str) -> Self {
        Self::Table {
            kind: kind.to_string(),
            nested: true,
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::Overlay(_))
    }
}

pub struct TextPage {
    pub title: String,
    pub body: Vec<String>,
    pub scroll: usize,
    pub follow: Option<StreamHandle>,
    pub highlighted: Option<Highlighted>,
}

impl TextPage {
    pub fn new(title: impl Into<String>, body: &str) -> Self {
        Self {
            title: title.into(),
            body: body.lines().map(ToString::to_string).collect(),
            scroll: 0,
            follow: None,
            highlighted: None,
        }
    }

    pub fn highlighted(title: impl Into<String>, body: &str, style: &str) -> Self {
        let (format, text) = highlight::detect(body);
        let highlighted = highlight::highlight(&text, format, style);
        Self {
            highlighted: Some(highlighted),
            ..Self::new(title, &text)
        }
    }

    pub fn streaming(title: impl Into<String>, handle: StreamHandle) -> Self {
        Self {
            title: title.into(),
            body: Vec::new(),
            scroll: 0,
            follow: Some(handle),
            highlighted: None,
        }
    }

    pub fn stream_id(&self) -> Option<u64> {
        self.follow.as_ref().map(StreamHandle::id)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.body.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_to(&mut self, bottom: bool) {
        self.scroll = if bottom {
            self.body.len().saturating_sub(1)
        } else {
            0
        };
    }
}

pub enum Overlay {
    Menu,
    Search { input: String },
    Dialog { name: String, dialog: Dialog },
    Status(Banner),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Choice(ChoiceList),
    Confirm(Confirm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceList {
    pub title: String,
    pub items: Vec<ChoiceItem>,
    pub selected: usize,
}

impl ChoiceList {
    pub fn new(title: impl Into<String>, items: Vec<ChoiceItem>) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
        }
    }

    pub fn move_by(&mut self, delta: isize) {
        let max = self.items.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(max);
    }

    pub fn by_shortcut(&self, shortcut: char) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.shortcut == Some(shortcut))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    pub label: String,
    pub description: String,
    pub shortcut: Option<char>,
    pub effect: ChoiceEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceEffect {
    Command(Command),
    Action {
        name: String,
        argument: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirm {
    pub prompt: String,
    pub confirm_label: String,
    pub confirm_selected: bool,
    pub on_confirm: Command,
}

impl Confirm {
    pub fn new(prompt: impl Into<String>, confirm_label: &str, on_confirm: Command) -> Self {
        Self {
            prompt: prompt.into(),
            confirm_label: confirm_label.to_string(),
            confirm_selected: false,
            on_confirm,
        }
    }
}

pub struct Navigator {
    current: String,
    pages: HashMap<String, Vec<Layer>>,
}

impl Navigator {
    pub fn new(root: &str) -> Self {
        let mut pages = HashMap::new();
        pages.insert(root.to_string(), vec![Layer::table(root)]);
        Self {
            current: root.to_string(),
            pages,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn open(&mut self, page: &str) {
        self.ensure(page);
        self.current = page.to_string();
    }

    pub fn layers(&self) -> &[Layer] {
        self.pages
            .get(&self.current)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.layers().iter().filter(|layer| !layer.is_overlay()).count()
    }

    pub fn focused(&self) -> Option<&Layer> {
        self.layers()
            .iter()
            .rev()
            .find(|layer| !matches!(layer, Layer::Overlay(Overlay::Status(_))))
    }

    pub fn focused_mut(&mut self) -> Option<&mut Layer> {
        self.stack_mut()
            .iter_mut()
            .rev()
            .find(|layer| !matches!(layer, Layer::Overlay(Overlay::Status(_))))
    }

    pub fn focused_table(&self) -> Option<&str> {
        self.layers().iter().rev().find_map(|layer| match layer {
            Layer::Table { kind, .. } => Some(kind.as_str()),
            _ => None,
        })
    }

    pub fn has_overlay(&self) -> bool {
        self.layers().iter().any(|layer| {
            matches!(layer, Layer::Overlay(overlay) if !matches!(overlay, Overlay::Status(_)))
        })
    }

    pub fn switch_page(&mut self, page: &str, layer: Layer) {
        let own_root = matches!(&layer, Layer::Table { kind, nested: false } if kind == page);
        let stack = self.ensure(page);
        stack.retain(|existing| !existing.is_overlay());
        if own_root {
            stack.truncate(1);
        } else {
            stack.push(layer);
        }
    }

    pub fn insert_overlay(&mut self, overlay: Overlay) {
        self.stack_mut().push(Layer::Overlay(overlay));
    }

    pub fn insert_dialog(&mut self, name: &str, dialog: Dialog) {
        self.insert_overlay(Overlay::Dialog {
            name: name.to_string(),
            dialog,
        });
    }

    pub fn toggle_menu(&mut self) -> bool {
        let stack = self.stack_mut();
        if let Some(index) = stack
            .iter()
            .rposition(|layer| matches!(layer, Layer::Overlay(Overlay::Menu)))
        {
            stack.remove(index);
            false
        } else {
            stack.push(Layer::Overlay(Overlay::Menu));
            true
        }
    }

    pub fn escape(&mut self) -> bool {
        let stack = self.stack_mut();
        if let Some(index) = stack.iter().rposition(|layer| {
            matches!(layer, Layer::Overlay(overlay) if !matches!(overlay, Overlay::Status(_)))
        }) {
            stack.remove(index);
            return true;
        }
        self.back_page().is_some()
    }

    pub fn back_page(&mut self) -> Option<Layer> {
        let stack = self.stack_mut();
        let index = stack
            .iter()
            .rposition(|layer| !matches!(layer, Layer::Overlay(Overlay::Status(_))))?;
        (index > 0).then(|| stack.remove(index))
    }

    pub fn switch_to_root_page(&mut self) {
        self.stack_mut().truncate(1);
    }

    pub fn push_banner(&mut self, banner: Banner) {
        self.insert_overlay(Overlay::Status(banner));
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.layers().iter().rev().find_map(|layer| match layer {
            Layer::Overlay(Overlay::Status(banner)) => Some(banner),
            _ => None,
        })
    }

    pub fn dismiss_banners(&mut self) -> bool {
        let stack = self.stack_mut();
        let before = stack.len();
        stack.retain(|layer| !matches!(layer, Layer::Overlay(Overlay::Status(_))));
        before != stack.len()
    }

    pub fn expire_banners(&mut self, now: Instant) -> bool {
        let mut removed = false;
        for stack in self.pages.values_mut() {
            let before = stack.len();
            stack.retain(|layer| match layer {
                Layer::Overlay(Overlay::Status(banner)) => banner.expires_at > now,
                _ => true,
            });
            removed |= before != stack.len();
        }
        removed
    }

    pub fn stream_page_mut(&mut self, stream: u64) -> Option<&mut TextPage> {
        self.pages
            .values_mut()
            .flat_map(|stack| stack.iter_mut())
            .find_map(|layer| match layer {
                Layer::Text(page) if page.stream_id() == Some(stream) => Some(page),
                _ => None,
            })
    }

    fn ensure(&mut self, page: &str) -> &mut Vec<Layer> {
        self.pages
            .entry(page.to_string())
            .or_insert_with(|| vec![Layer::table(page)])
    }

    fn stack_mut(&mut self) -> &mut Vec<Layer> {
        let current = self.current.clone();
        self.ensure(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn banner(message: &str, is_error: bool, expires_at: Instant) -> Banner {
        Banner {
            message: message.to_string(),
            is_error,
            expires_at,
        }
    }

    #[test]
    fn root_table_is_never_popped() {
        let mut nav = Navigator::new("services");
        assert!(nav.back_page().is_none());
        assert!(!nav.escape());
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.focused_table(), Some("services"));
    }

    #[test]
    fn switch_page_discards_overlays_and_stacks_content() {
        let mut nav = Navigator::new("services");
        nav.toggle_menu();
        nav.switch_page("services", Layer::nested("pods"));
        assert!(!nav.has_overlay());
        assert_eq!(nav.focused_table(), Some("pods"));

        nav.switch_page("services", Layer::Text(TextPage::new("inspect", "a: 1\nb: 2")));
        assert_eq!(nav.depth(), 3);
        assert_eq!(nav.focused_table(), Some("pods"));

        nav.switch_page("services", Layer::table("services"));
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn escape_collapses_overlay_before_stepping_back() {
        let mut nav = Navigator::new("kubernetes");
        nav.switch_page("kubernetes", Layer::nested("pods"));
        nav.insert_overlay(Overlay::Search {
            input: String::new(),
        });
        assert!(nav.has_overlay());

        assert!(nav.escape());
        assert!(!nav.has_overlay());
        assert_eq!(nav.focused_table(), Some("pods"));

        assert!(nav.escape());
        assert_eq!(nav.focused_table(), Some("kubernetes"));
    }

    #[test]
    fn menu_toggles() {
        let mut nav = Navigator::new("services");
        assert!(nav.toggle_menu());
        assert!(matches!(nav.focused(), Some(Layer::Overlay(Overlay::Menu))));
        assert!(!nav.toggle_menu());
        assert!(!nav.has_overlay());
    }

    #[test]
    fn banners_sit_above_input_and_expire() {
        let now = Instant::now();
        let mut nav = Navigator::new("services");
        nav.push_banner(banner("refresh failed", true, now + Duration::from_secs(1)));
        assert!(matches!(nav.focused(), Some(Layer::Table { .. })));
        assert!(!nav.has_overlay());
        assert_eq!(nav.banner().map(|b| b.is_error), Some(true));

        assert!(!nav.expire_banners(now));
        assert!(nav.expire_banners(now + Duration::from_secs(2)));
        assert!(nav.banner().is_none());
    }

    #[test]
    fn pages_keep_independent_stacks() {
        let mut nav = Navigator::new("services");
        nav.switch_page("services", Layer::nested("pods"));
        nav.open("routes");
        assert_eq!(nav.focused_table(), Some("routes"));
        nav.open("services");
        assert_eq!(nav.focused_table(), Some("pods"));
        nav.switch_to_root_page();
        assert_eq!(nav.focused_table(), Some("services"));
    }

    #[test]
    fn choice_list_moves_within_bounds() {
        let item = |label: &str, shortcut| ChoiceItem {
            label: label.to_string(),
            description: String::new(),
            shortcut: Some(shortcut),
            effect: ChoiceEffect::Action {
                name: label.to_string(),
                argument: None,
            },
        };
        let mut list = ChoiceList::new("actions", vec![item("inspect", 'i'), item("delete", 'd')]);
        list.move_by(-1);
        assert_eq!(list.selected, 0);
        list.move_by(5);
        assert_eq!(list.selected, 1);
        assert_eq!(list.by_shortcut('i'), Some(0));
    }
}
