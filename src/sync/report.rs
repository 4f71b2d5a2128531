use crate::core::repository::StorageError;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use thiserror::Error;

/// Tally of one pass over the active assets.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub total: usize,
    /// Price fetched and recorded.
    pub updated: usize,
    /// Provider returned no usable price.
    pub skipped: usize,
    /// Asset disappeared between listing and writing.
    pub missing: usize,
    /// Write failed; the asset will be retried next cycle.
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn new(total: usize) -> Self {
        CycleReport {
            total,
            updated: 0,
            skipped: 0,
            missing: 0,
            failed: 0,
            finished_at: Utc::now(),
        }
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "updated {}/{} assets at {}",
            self.updated,
            self.total,
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Storage unavailable after {failures} failed write(s): {source}")]
    StorageUnavailable {
        failures: usize,
        source: StorageError,
    },
    #[error("Sync cancelled")]
    Cancelled,
}
