use crate::datasource::RefreshError;
use crate::view::ViewCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Single-slot refresh queue: any number of signals raised before the task
/// wakes collapse into one pending refresh.
#[derive(Debug, Default)]
pub struct RefreshSlot {
    notify: Notify,
}

impl RefreshSlot {
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

struct Attached {
    slot: Arc<RefreshSlot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Scheduler {
    cancel: CancellationToken,
    attached: HashMap<String, Attached>,
}

impl Scheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            attached: HashMap::new(),
        }
    }

    pub fn attach(&mut self, core: Arc<ViewCore>) {
        let kind = core.kind().kind().to_string();
        let slot = Arc::new(RefreshSlot::default());
        let cancel = self.cancel.child_token();
        let task = spawn_refresh_task(core, slot.clone(), cancel.clone());
        if let Some(previous) = self.attached.insert(kind.clone(), Attached { slot, cancel, task }) {
            debug!(kind = %kind, "replacing attached view");
            previous.cancel.cancel();
        }
    }

    pub fn signal(&self, kind: &str) -> bool {
        match self.attached.get(kind) {
            Some(attached) => {
                attached.slot.signal();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self, kind: &str) -> bool {
        self.attached
            .get(kind)
            .is_some_and(|attached| !attached.task.is_finished())
    }

    pub fn shutdown(&mut self) {
        info!(views = self.attached.len(), "stopping refresh tasks");
        self.cancel.cancel();
        self.attached.clear();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_refresh_task(
    core: Arc<ViewCore>,
    slot: Arc<RefreshSlot>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let kind = core.kind().kind().to_string();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = slot.wait() => {}
            }
            // other failures are reported to the foreground by the view itself
            let outcome = refresh_until_cancelled(&core, &cancel).await;
            if let Err(RefreshError::Cancelled) = outcome {
                break;
            }
        }
        debug!(kind = %kind, "refresh task stopped");
    })
}

async fn refresh_until_cancelled(
    core: &ViewCore,
    cancel: &CancellationToken,
) -> Result<(), RefreshError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RefreshError::Cancelled),
        result = core.refresh() => result,
    }
}
