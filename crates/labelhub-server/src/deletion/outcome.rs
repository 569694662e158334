//! Result types reported by a dataset deletion

use chrono::{DateTime, Utc};
use labelhub_common::types::{DatasetId, UserId};
use serde::Serialize;

use super::graph::DependentKind;

/// Rows removed so far, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovedCounts {
    pub labels: u64,
    pub entries: u64,
    pub progress: u64,
    pub datasets: u64,
}

impl RemovedCounts {
    pub fn record(&mut self, kind: DependentKind, rows: u64) {
        match kind {
            DependentKind::Label => self.labels += rows,
            DependentKind::Entry => self.entries += rows,
            DependentKind::Progress => self.progress += rows,
        }
    }

    pub fn dependents(&self) -> u64 {
        self.labels + self.entries + self.progress
    }

    pub fn total(&self) -> u64 {
        self.dependents() + self.datasets
    }
}

impl std::fmt::Display for RemovedCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} labels, {} entries, {} progress rows, {} datasets",
            self.labels, self.entries, self.progress, self.datasets
        )
    }
}

/// Non-fatal failure to remove a dataset's stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobCleanupWarning {
    pub key: String,
    pub reason: String,
}

impl std::fmt::Display for BlobCleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stored file '{}' was not removed: {}", self.key, self.reason)
    }
}

/// What happened to the dataset's stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlobCleanup {
    /// No file path was recorded, or the dataset was already gone
    Skipped,
    Removed { key: String },
    Warning(BlobCleanupWarning),
}

impl BlobCleanup {
    pub fn warning(&self) -> Option<&BlobCleanupWarning> {
        match self {
            BlobCleanup::Warning(warning) => Some(warning),
            _ => None,
        }
    }
}

/// Successful result of a dataset deletion.
///
/// Success means the dataset row and every dependent row are gone. The stored
/// file removal is best-effort; check [`DeletionOutcome::has_warning`].
#[derive(Debug, Clone, Serialize)]
pub struct DeletionOutcome {
    pub dataset_id: DatasetId,
    pub deleted_by: UserId,
    pub removed: RemovedCounts,
    pub file_path: Option<String>,
    pub blob_cleanup: BlobCleanup,
    /// The dataset row was already absent when its file path was looked up
    pub already_absent: bool,
    pub completed_at: DateTime<Utc>,
}

impl DeletionOutcome {
    pub fn has_warning(&self) -> bool {
        self.blob_cleanup.warning().is_some()
    }
}
