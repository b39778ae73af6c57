use crate::grid::Grid;
use chrono::{DateTime, Local};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("{0}")]
    Command(String),
    #[error("{0}")]
    Api(String),
    #[error("refresh cancelled")]
    Cancelled,
}

pub type Refresher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<String, RefreshError>> + Send + Sync>;

pub fn refresher<F, Fut>(fetch: F) -> Refresher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, RefreshError>> + Send + 'static,
{
    Arc::new(move || fetch().boxed())
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    grid: Arc<Grid>,
    refreshed_at: Option<DateTime<Local>>,
}

pub struct DataSource {
    refresher: Refresher,
    snapshot: RwLock<Snapshot>,
}

impl DataSource {
    pub fn new(refresher: Refresher) -> Self {
        Self {
            refresher,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Runs the refresher once. The cached grid is only replaced after the
    /// output was fetched and parsed; errors leave it as it was.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let raw = (self.refresher)().await?;
        let grid = Arc::new(Grid::parse(&raw));
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = Snapshot {
            grid,
            refreshed_at: Some(Local::now()),
        };
        Ok(())
    }

    pub fn grid(&self) -> Arc<Grid> {
        self.read().grid
    }

    pub fn header(&self) -> Vec<String> {
        self.grid().header.clone()
    }

    pub fn data(&self) -> Vec<Vec<String>> {
        self.grid().rows.clone()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Local>> {
        self.read().refreshed_at
    }

    fn read(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
