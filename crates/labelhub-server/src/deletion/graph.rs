//! Dataset dependency graph
//!
//! The ordered plan that removes a dataset. Dependents go first so no row is
//! ever left pointing at a missing dataset; the file path is read before the
//! dataset row (the only record of the blob key) is removed; the blob goes
//! last because it is the one step allowed to fail.

use serde::Serialize;

/// Entity kinds whose rows reference a dataset by foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Label,
    Entry,
    Progress,
}

impl DependentKind {
    /// Table holding rows of this kind
    pub fn table(self) -> &'static str {
        match self {
            DependentKind::Label => "dataset_labels",
            DependentKind::Entry => "dataset_entries",
            DependentKind::Progress => "label_progress",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DependentKind::Label => "label",
            DependentKind::Entry => "entry",
            DependentKind::Progress => "progress",
        }
    }
}

impl std::fmt::Display for DependentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the dataset deletion plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    DeleteLabels,
    DeleteEntries,
    DeleteProgress,
    LookupFilePath,
    DeleteDataset,
    RemoveStoredFile,
}

/// Steps in execution order. Nothing may reorder them.
pub const DATASET_DELETION_PLAN: [DeletionStep; 6] = [
    DeletionStep::DeleteLabels,
    DeletionStep::DeleteEntries,
    DeletionStep::DeleteProgress,
    DeletionStep::LookupFilePath,
    DeletionStep::DeleteDataset,
    DeletionStep::RemoveStoredFile,
];

impl DeletionStep {
    /// 1-based position in [`DATASET_DELETION_PLAN`]
    pub fn ordinal(self) -> u8 {
        match self {
            DeletionStep::DeleteLabels => 1,
            DeletionStep::DeleteEntries => 2,
            DeletionStep::DeleteProgress => 3,
            DeletionStep::LookupFilePath => 4,
            DeletionStep::DeleteDataset => 5,
            DeletionStep::RemoveStoredFile => 6,
        }
    }

    /// Dependent kind removed by this step, if it is a foreign-key delete
    pub fn dependent_kind(self) -> Option<DependentKind> {
        match self {
            DeletionStep::DeleteLabels => Some(DependentKind::Label),
            DeletionStep::DeleteEntries => Some(DependentKind::Entry),
            DeletionStep::DeleteProgress => Some(DependentKind::Progress),
            _ => None,
        }
    }

    /// Whether the step changes relational or object-store state
    pub fn is_mutating(self) -> bool {
        !matches!(self, DeletionStep::LookupFilePath)
    }

    /// Best-effort steps are logged on failure but never fail the deletion
    pub fn is_best_effort(self) -> bool {
        matches!(self, DeletionStep::RemoveStoredFile)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeletionStep::DeleteLabels => "delete_labels",
            DeletionStep::DeleteEntries => "delete_entries",
            DeletionStep::DeleteProgress => "delete_progress",
            DeletionStep::LookupFilePath => "lookup_file_path",
            DeletionStep::DeleteDataset => "delete_dataset",
            DeletionStep::RemoveStoredFile => "remove_stored_file",
        }
    }
}

impl std::fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dependent-row deletes of the plan, in order
pub fn dependent_steps() -> impl Iterator<Item = (DeletionStep, DependentKind)> {
    DATASET_DELETION_PLAN
        .iter()
        .filter_map(|step| step.dependent_kind().map(|kind| (*step, kind)))
}
