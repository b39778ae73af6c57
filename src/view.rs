use crate::datasource::{DataSource, RefreshError, Refresher};
use crate::model::{ActionDef, Command, Position, ResourceKind, UiEvent};
use crate::nav::{Dialog, Layer};
use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

pub struct ViewCore {
    kind: ResourceKind,
    source: DataSource,
    refresh_lock: Mutex<()>,
    events: mpsc::UnboundedSender<UiEvent>,
}

impl ViewCore {
    pub fn new(
        kind: ResourceKind,
        refresher: Refresher,
        events: mpsc::UnboundedSender<UiEvent>,
    ) -> Self {
        Self {
            kind,
            source: DataSource::new(refresher),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let _guard = self.refresh_lock.lock().await;
        let kind = self.kind.kind().to_string();
        match self.source.refresh().await {
            Ok(()) => {
                debug!(kind = %kind, rows = self.source.grid().rows.len(), "view refreshed");
                let _ = self.events.send(UiEvent::Refreshed { kind });
                Ok(())
            }
            Err(error) => {
                warn!(kind = %kind, error = %error, "view refresh failed");
                let _ = self.events.send(UiEvent::RefreshFailed {
                    kind,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionMemory {
    positions: HashMap<String, Position>,
}

impl SelectionMemory {
    pub fn get(&self, kind: &str) -> Option<Position> {
        self.positions.get(kind).copied()
    }

    pub fn remember(&mut self, kind: &str, position: Position) {
        self.positions.insert(kind.to_string(), position);
    }
}

#[derive(Clone)]
pub struct ViewSpec {
    pub kind: ResourceKind,
    pub refresher: Refresher,
    pub actions: Vec<ActionDef>,
    pub handler: Arc<dyn EventHandler>,
}

/// Resource-specific key bindings. Returning `false` lets the shell apply
/// its default bindings to the key.
pub trait EventHandler {
    fn on_key(&self, key: KeyEvent, view: &mut dyn ViewHandle) -> bool;

    fn on_action(&self, _action: &str, _argument: Option<&str>, _view: &mut dyn ViewHandle) {}
}

pub trait ViewHandle {
    fn selection_name(&self) -> Option<String>;
    fn selected_cell(&self, column: usize) -> Option<String>;
    fn header(&self) -> Vec<String>;
    fn resource_kind(&self) -> String;
    fn current_page(&self) -> String;
    fn actions(&self) -> Vec<ActionDef>;
    fn switch_page(&mut self, page: &str, layer: Layer);
    fn insert_dialog(&mut self, name: &str, dialog: Dialog);
    fn back_page(&mut self);
    fn switch_to_root_page(&mut self);
    fn update_status(&mut self, message: &str, is_error: bool);
    fn refresh(&mut self);
    fn show_search(&mut self);
    fn show_menu(&mut self);
    fn navigate(&mut self, key: char) -> bool;
    fn push_nested(&mut self, spec: ViewSpec);
    fn dispatch(&mut self, command: Command);
}

pub struct TableView {
    core: Arc<ViewCore>,
    handler: Arc<dyn EventHandler>,
    actions: Vec<ActionDef>,
    selection: Position,
    search: Option<String>,
}

impl TableView {
    pub fn new(
        spec: ViewSpec,
        events: mpsc::UnboundedSender<UiEvent>,
        memory: &SelectionMemory,
    ) -> Self {
        let selection = memory.get(spec.kind.kind()).unwrap_or_default();
        Self {
            core: Arc::new(ViewCore::new(spec.kind, spec.refresher, events)),
            handler: spec.handler,
            actions: spec.actions,
            selection,
            search: None,
        }
    }

    pub fn core(&self) -> Arc<ViewCore> {
        self.core.clone()
    }

    pub fn kind(&self) -> &ResourceKind {
        self.core.kind()
    }

    pub fn handler(&self) -> Arc<dyn EventHandler> {
        self.handler.clone()
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn is_populated(&self) -> bool {
        self.core.source().refreshed_at().is_some()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Local>> {
        self.core.source().refreshed_at()
    }

    pub fn header(&self) -> Vec<String> {
        self.core.source().header()
    }

    pub fn visible_rows(&self) -> Vec<Vec<String>> {
        visible_rows(self.core.source().data(), self.search.as_deref())
    }

    pub fn selection(&self) -> Position {
        self.selection
    }

    pub fn selected_index(&self) -> Option<usize> {
        let count = self.visible_rows().len();
        (count > 0).then(|| self.selection.row.min(count - 1))
    }

    pub fn selected_column(&self) -> usize {
        let width = self.header().len();
        self.selection.column.min(width.saturating_sub(1))
    }

    pub fn selected_row(&self) -> Option<Vec<String>> {
        let rows = self.visible_rows();
        let index = self.selected_index()?;
        rows.into_iter().nth(index)
    }

    pub fn selection_name(&self) -> Option<String> {
        let row = self.selected_row()?;
        row.first()?
            .split_whitespace()
            .next()
            .map(ToString::to_string)
    }

    pub fn selected_cell(&self, column: usize) -> Option<String> {
        self.selected_row()?.get(column).cloned()
    }

    pub fn select(&mut self, row: usize, column: usize, memory: &mut SelectionMemory) {
        self.selection = Position { row, column };
        memory.remember(self.kind().kind(), self.selection);
    }

    pub fn move_selection(&mut self, delta: isize, memory: &mut SelectionMemory) {
        let count = self.visible_rows().len();
        if count == 0 {
            return;
        }
        let current = self.selected_index().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(count - 1);
        self.select(next, self.selection.column, memory);
    }

    pub fn select_edge(&mut self, bottom: bool, memory: &mut SelectionMemory) {
        let count = self.visible_rows().len();
        let row = if bottom { count.saturating_sub(1) } else { 0 };
        self.select(row, self.selection.column, memory);
    }

    pub fn move_column(&mut self, delta: isize, memory: &mut SelectionMemory) {
        let width = self.header().len();
        if width == 0 {
            return;
        }
        let next = self
            .selected_column()
            .saturating_add_signed(delta)
            .min(width - 1);
        self.select(self.selection.row, next, memory);
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_string());
    }
}

fn visible_rows(rows: Vec<Vec<String>>, search: Option<&str>) -> Vec<Vec<String>> {
    let needle = search.map(str::to_lowercase);
    rows.into_iter()
        .filter(|row| row.first().is_some_and(|cell| !cell.is_empty()))
        .filter(|row| match &needle {
            Some(needle) => row
                .iter()
                .any(|cell| cell.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .collect()
}
