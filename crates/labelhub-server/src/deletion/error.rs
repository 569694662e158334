//! Deletion error taxonomy

use labelhub_common::types::DatasetId;
use std::time::Duration;
use thiserror::Error;

use super::graph::DeletionStep;
use super::outcome::RemovedCounts;

/// Failure of a single store operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity, pool exhaustion or I/O failure
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The caller-supplied step timeout elapsed
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Foreign key, unique or check constraint rejected the operation
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Any other rejection reported by the store
    #[error("store rejected operation: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Transient failures that may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) => match db_err.kind() {
                sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation => {
                    StoreError::Constraint(db_err.message().to_string())
                },
                _ => StoreError::Rejected(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

/// Why a dataset deletion did not complete
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("Deletion of dataset '{dataset_id}' is already in progress")]
    AlreadyInProgress { dataset_id: DatasetId },

    #[error("Could not acquire deletion guard for dataset '{dataset_id}': {cause}")]
    GuardUnavailable {
        dataset_id: DatasetId,
        cause: StoreError,
    },

    #[error("Store unavailable during {step}: {cause}")]
    StoreUnavailable { step: DeletionStep, cause: StoreError },

    #[error("Store rejected {step}: {cause}")]
    ConstraintViolation { step: DeletionStep, cause: StoreError },

    /// A mutating step had completed before `failed_step` failed. The dataset
    /// row is still present when `failed_step` precedes it; re-invoking the
    /// deletion converges.
    #[error("Deletion partially completed: {failed_step} failed after removing {removed}: {cause}")]
    PartiallyCompleted {
        failed_step: DeletionStep,
        removed: RemovedCounts,
        cause: StoreError,
    },
}

impl DeletionError {
    /// Classify a failed required step.
    ///
    /// `removed` and `mutated` describe the work finished before `step`.
    pub(crate) fn at_step(
        step: DeletionStep,
        cause: StoreError,
        removed: RemovedCounts,
        mutated: bool,
    ) -> Self {
        if mutated {
            return DeletionError::PartiallyCompleted {
                failed_step: step,
                removed,
                cause,
            };
        }

        if cause.is_transient() {
            DeletionError::StoreUnavailable { step, cause }
        } else {
            DeletionError::ConstraintViolation { step, cause }
        }
    }

    /// Whether retrying automatically is reasonable.
    ///
    /// Every deletion is safe to re-invoke; this only separates transient
    /// failures from rejections an operator should look at first.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeletionError::AlreadyInProgress { .. } => true,
            DeletionError::GuardUnavailable { .. } => true,
            DeletionError::StoreUnavailable { .. } => true,
            DeletionError::ConstraintViolation { .. } => false,
            DeletionError::PartiallyCompleted { cause, .. } => cause.is_transient(),
        }
    }

    pub fn failed_step(&self) -> Option<DeletionStep> {
        match self {
            DeletionError::StoreUnavailable { step, .. }
            | DeletionError::ConstraintViolation { step, .. } => Some(*step),
            DeletionError::PartiallyCompleted { failed_step, .. } => Some(*failed_step),
            DeletionError::AlreadyInProgress { .. } | DeletionError::GuardUnavailable { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_failure_is_not_partial() {
        let err = DeletionError::at_step(
            DeletionStep::DeleteLabels,
            StoreError::Unavailable("connection refused".to_string()),
            RemovedCounts::default(),
            false,
        );
        assert!(matches!(err, DeletionError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.failed_step(), Some(DeletionStep::DeleteLabels));
    }

    #[test]
    fn test_rejection_maps_to_constraint_violation() {
        let err = DeletionError::at_step(
            DeletionStep::DeleteLabels,
            StoreError::Constraint("violates foreign key constraint".to_string()),
            RemovedCounts::default(),
            false,
        );
        assert!(matches!(err, DeletionError::ConstraintViolation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_later_failure_is_partial() {
        let removed = RemovedCounts {
            labels: 2,
            ..Default::default()
        };
        let err = DeletionError::at_step(
            DeletionStep::DeleteEntries,
            StoreError::Timeout(Duration::from_secs(5)),
            removed,
            true,
        );
        match &err {
            DeletionError::PartiallyCompleted {
                failed_step,
                removed,
                ..
            } => {
                assert_eq!(*failed_step, DeletionStep::DeleteEntries);
                assert_eq!(removed.labels, 2);
            },
            other => panic!("expected PartiallyCompleted, got {:?}", other),
        }
        assert!(err.is_retryable());
        assert!(err.to_string().contains("delete_entries"));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
