//! Sync run reports and progress events

use serde::Serialize;
use std::fmt;

/// The sequential stages of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    Categories,
    Products,
    Variations,
    Complete,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Variations => "variations",
            Self::Complete => "complete",
        };
        write!(f, "{label}")
    }
}

/// A progress event emitted during a run.
///
/// `total` is an estimate while pages are still being fetched (the remote
/// does not report totals reliably); treat it as an approximation.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    pub stage: SyncStage,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Per-entity counters plus the accumulated per-item error log.
///
/// Errors are append-only during a run; an entry never aborts the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncDetails {
    pub categories_created: usize,
    pub categories_updated: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub variations_created: usize,
    pub variations_updated: usize,
    pub errors: Vec<String>,
}

impl SyncDetails {
    /// Total rows touched across all three entity kinds.
    #[must_use]
    pub const fn total_synced(&self) -> usize {
        self.categories_created
            + self.categories_updated
            + self.products_created
            + self.products_updated
            + self.variations_created
            + self.variations_updated
    }
}

/// Final result of one sync run. `success` is true iff no per-item or
/// page-level error was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub details: SyncDetails,
}
