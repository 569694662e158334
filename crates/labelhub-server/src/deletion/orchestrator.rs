//! Dataset deletion orchestrator
//!
//! Walks [`DATASET_DELETION_PLAN`] for one dataset under its deletion guard,
//! folding each step's result into a [`DeletionOutcome`] or a
//! [`DeletionError`].

use chrono::Utc;
use labelhub_common::types::DatasetId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::cleanup::{remove_stored_file, ObjectStore};
use super::error::{DeletionError, StoreError};
use super::executor::{with_timeout, RelationalStore};
use super::graph::{DeletionStep, DATASET_DELETION_PLAN};
use super::guard::DeletionGuard;
use super::outcome::{BlobCleanup, DeletionOutcome, RemovedCounts};
use super::principal::AuthorizedPrincipal;

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Single entry point for removing a dataset and everything that depends on it
#[derive(Clone)]
pub struct DatasetDeleter {
    relational: Arc<dyn RelationalStore>,
    objects: Arc<dyn ObjectStore>,
    guard: Arc<dyn DeletionGuard>,
    step_timeout: Duration,
}

/// Progress through the plan, carried between steps
#[derive(Default)]
struct PlanState {
    removed: RemovedCounts,
    mutated: bool,
    file_path: Option<String>,
    blob_cleanup: Option<BlobCleanup>,
}

impl DatasetDeleter {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        objects: Arc<dyn ObjectStore>,
        guard: Arc<dyn DeletionGuard>,
    ) -> Self {
        Self {
            relational,
            objects,
            guard,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Delete `dataset_id` with its labels, entries, progress and stored file.
    ///
    /// On success the dataset row and every dependent row are gone; the stored
    /// file removal is best-effort and reported in
    /// [`DeletionOutcome::blob_cleanup`]. Deleting an absent dataset succeeds.
    /// Any error leaves the store safe to retry.
    #[instrument(
        skip(self, actor),
        fields(dataset_id = %dataset_id, actor = %actor.user_id())
    )]
    pub async fn delete_dataset(
        &self,
        dataset_id: DatasetId,
        actor: &AuthorizedPrincipal,
    ) -> Result<DeletionOutcome, DeletionError> {
        let permit = match self.guard.try_acquire(dataset_id).await {
            Ok(Some(permit)) => permit,
            Ok(None) => {
                warn!("Deletion already in progress");
                return Err(DeletionError::AlreadyInProgress { dataset_id });
            },
            Err(cause) => {
                error!(error = %cause, "Failed to acquire deletion guard");
                return Err(DeletionError::GuardUnavailable { dataset_id, cause });
            },
        };

        info!(authority = ?actor.authority(), "Deleting dataset");

        let result = self.run_plan(dataset_id, actor).await;
        permit.release().await;

        match &result {
            Ok(outcome) if outcome.already_absent => {
                info!("Dataset already absent; nothing to delete")
            },
            Ok(outcome) => info!(removed = %outcome.removed, "Dataset deleted"),
            Err(err) => error!(error = %err, retryable = err.is_retryable(), "Dataset deletion failed"),
        }

        result
    }

    async fn run_plan(
        &self,
        dataset_id: DatasetId,
        actor: &AuthorizedPrincipal,
    ) -> Result<DeletionOutcome, DeletionError> {
        let mut state = PlanState::default();

        for step in DATASET_DELETION_PLAN {
            match step {
                DeletionStep::DeleteLabels
                | DeletionStep::DeleteEntries
                | DeletionStep::DeleteProgress => {
                    let Some(kind) = step.dependent_kind() else {
                        continue;
                    };
                    let rows = self
                        .required(step, &state, self.relational.delete_dependents(kind, dataset_id))
                        .await?;
                    state.removed.record(kind, rows);
                    state.mutated = true;
                    debug!(step = %step, rows, "Step complete");
                },
                DeletionStep::LookupFilePath => {
                    let lookup = self
                        .required(step, &state, self.relational.find_file_path(dataset_id))
                        .await?;
                    match lookup {
                        Some(path) => state.file_path = path,
                        None => return Ok(self.outcome(dataset_id, actor, state, true)),
                    }
                },
                DeletionStep::DeleteDataset => {
                    let rows = self
                        .required(step, &state, self.relational.delete_dataset(dataset_id))
                        .await?;
                    state.removed.datasets = rows;
                    state.mutated = true;
                    debug!(step = %step, rows, "Step complete");
                },
                DeletionStep::RemoveStoredFile => {
                    state.blob_cleanup = Some(
                        remove_stored_file(
                            self.objects.as_ref(),
                            state.file_path.as_deref(),
                            self.step_timeout,
                        )
                        .await,
                    );
                },
            }
        }

        // Another writer can remove the row between lookup and delete.
        let already_absent = state.removed.datasets == 0;
        Ok(self.outcome(dataset_id, actor, state, already_absent))
    }

    /// Await a required step under the step timeout; failure aborts the plan
    async fn required<T>(
        &self,
        step: DeletionStep,
        state: &PlanState,
        operation: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, DeletionError> {
        with_timeout(self.step_timeout, operation)
            .await
            .map_err(|cause| {
                warn!(step = %step, error = %cause, removed = %state.removed, "Required step failed");
                DeletionError::at_step(step, cause, state.removed, state.mutated)
            })
    }

    fn outcome(
        &self,
        dataset_id: DatasetId,
        actor: &AuthorizedPrincipal,
        state: PlanState,
        already_absent: bool,
    ) -> DeletionOutcome {
        if let Some(warning) = state.blob_cleanup.as_ref().and_then(BlobCleanup::warning) {
            warn!(warning = %warning, "Dataset deleted with blob cleanup warning");
        }

        DeletionOutcome {
            dataset_id,
            deleted_by: actor.user_id(),
            removed: state.removed,
            file_path: state.file_path,
            blob_cleanup: state.blob_cleanup.unwrap_or(BlobCleanup::Skipped),
            already_absent,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deletion::graph::DependentKind;
    use crate::deletion::guard::InMemoryDeletionGuard;
    use crate::deletion::test_helpers::{MemoryObjectStore, MemoryRelationalStore, StoreOp};
    use labelhub_common::types::UserId;
    use uuid::Uuid;

    struct Fixture {
        relational: MemoryRelationalStore,
        objects: MemoryObjectStore,
        guard: InMemoryDeletionGuard,
        deleter: DatasetDeleter,
    }

    fn fixture() -> Fixture {
        let relational = MemoryRelationalStore::default();
        let objects = MemoryObjectStore::with_objects(["csv/ds1.csv"]);
        let guard = InMemoryDeletionGuard::new();
        let deleter = DatasetDeleter::new(
            Arc::new(relational.clone()),
            Arc::new(objects.clone()),
            Arc::new(guard.clone()),
        )
        .with_step_timeout(Duration::from_secs(1));

        Fixture {
            relational,
            objects,
            guard,
            deleter,
        }
    }

    fn owner() -> AuthorizedPrincipal {
        AuthorizedPrincipal::owner(UserId::from_uuid(Uuid::new_v4()))
    }

    fn seed_ds1(store: &MemoryRelationalStore) -> DatasetId {
        store.seed(Some("csv/ds1.csv"), 2, 3, 1)
    }

    const DEPENDENT_ORDER: [StoreOp; 4] = [
        StoreOp::DeleteDependents(DependentKind::Label),
        StoreOp::DeleteDependents(DependentKind::Entry),
        StoreOp::DeleteDependents(DependentKind::Progress),
        StoreOp::DeleteDataset,
    ];

    #[tokio::test]
    async fn test_end_to_end_ds1() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        let actor = owner();

        let outcome = fx.deleter.delete_dataset(ds1, &actor).await.unwrap();

        assert_eq!(outcome.dataset_id, ds1);
        assert_eq!(outcome.deleted_by, actor.user_id());
        assert_eq!(
            outcome.removed,
            RemovedCounts {
                labels: 2,
                entries: 3,
                progress: 1,
                datasets: 1,
            }
        );
        assert_eq!(outcome.file_path.as_deref(), Some("csv/ds1.csv"));
        assert_eq!(
            outcome.blob_cleanup,
            BlobCleanup::Removed {
                key: "csv/ds1.csv".to_string()
            }
        );
        assert!(!outcome.already_absent);
        assert!(!outcome.has_warning());

        assert!(!fx.relational.dataset_exists(ds1));
        for kind in [DependentKind::Label, DependentKind::Entry, DependentKind::Progress] {
            assert_eq!(fx.relational.count(kind, ds1), 0);
        }
        assert!(!fx.objects.contains("csv/ds1.csv"));
        assert!(!fx.guard.is_held(ds1));
    }

    #[tokio::test]
    async fn test_relational_deletes_follow_plan_order() {
        let fx = fixture();
        let id = fx.relational.seed(None, 4, 7, 2);

        let outcome = fx.deleter.delete_dataset(id, &owner()).await.unwrap();

        assert_eq!(outcome.removed.dependents(), 4 + 7 + 2);
        assert_eq!(outcome.removed.datasets, 1);
        assert_eq!(fx.relational.mutations(), DEPENDENT_ORDER.to_vec());

        let calls = fx.relational.calls();
        let lookup = calls.iter().position(|op| *op == StoreOp::FindFilePath);
        let delete = calls.iter().position(|op| *op == StoreOp::DeleteDataset);
        assert!(lookup < delete, "file path must be read before the row is deleted");
    }

    #[tokio::test]
    async fn test_second_delete_is_noop_success() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.deleter.delete_dataset(ds1, &owner()).await.unwrap();
        fx.relational.clear_calls();

        let again = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap();

        assert!(again.already_absent);
        assert_eq!(again.removed, RemovedCounts::default());
        assert_eq!(again.blob_cleanup, BlobCleanup::Skipped);
        assert!(!fx.relational.calls().contains(&StoreOp::DeleteDataset));
        assert_eq!(fx.objects.deleted_keys(), vec!["csv/ds1.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_dataset_is_noop_success() {
        let fx = fixture();
        let outcome = fx.deleter.delete_dataset(DatasetId::new(), &owner()).await.unwrap();
        assert!(outcome.already_absent);
        assert_eq!(outcome.removed.total(), 0);
    }

    #[tokio::test]
    async fn test_other_datasets_untouched() {
        let fx = fixture();
        let target = fx.relational.seed(Some("csv/a.csv"), 1, 1, 1);
        let bystander = fx.relational.seed(Some("csv/ds1.csv"), 2, 3, 1);

        fx.deleter.delete_dataset(target, &owner()).await.unwrap();

        assert!(fx.relational.dataset_exists(bystander));
        assert_eq!(fx.relational.count(DependentKind::Entry, bystander), 3);
        assert!(fx.objects.contains("csv/ds1.csv"));
        assert_eq!(fx.relational.orphans(), 0);
    }

    #[tokio::test]
    async fn test_entry_failure_is_contained_and_retry_converges() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.relational.fail(
            StoreOp::DeleteDependents(DependentKind::Entry),
            StoreError::Unavailable("connection reset".to_string()),
        );

        let err = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap_err();

        match &err {
            DeletionError::PartiallyCompleted {
                failed_step,
                removed,
                ..
            } => {
                assert_eq!(*failed_step, DeletionStep::DeleteEntries);
                assert_eq!(removed.labels, 2);
                assert_eq!(removed.datasets, 0);
            },
            other => panic!("expected PartiallyCompleted, got {:?}", other),
        }
        assert!(err.is_retryable());
        assert!(fx.relational.dataset_exists(ds1));
        assert_eq!(fx.relational.count(DependentKind::Label, ds1), 0);
        assert_eq!(fx.relational.count(DependentKind::Entry, ds1), 3);
        assert_eq!(fx.relational.count(DependentKind::Progress, ds1), 1);
        assert!(fx.objects.contains("csv/ds1.csv"));
        assert!(!fx.guard.is_held(ds1));

        fx.relational.clear_failures();
        let outcome = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap();

        assert_eq!(outcome.removed.labels, 0);
        assert_eq!(outcome.removed.entries, 3);
        assert_eq!(outcome.removed.datasets, 1);
        assert!(!fx.relational.dataset_exists(ds1));
        assert_eq!(fx.relational.orphans(), 0);
        assert!(!fx.objects.contains("csv/ds1.csv"));
    }

    #[tokio::test]
    async fn test_first_step_failure_removes_nothing() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.relational.fail(
            StoreOp::DeleteDependents(DependentKind::Label),
            StoreError::Unavailable("connection refused".to_string()),
        );

        let err = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap_err();

        assert!(matches!(
            err,
            DeletionError::StoreUnavailable {
                step: DeletionStep::DeleteLabels,
                ..
            }
        ));
        assert_eq!(fx.relational.count(DependentKind::Label, ds1), 2);
        assert_eq!(fx.relational.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_first_step_rejection_is_constraint_violation() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.relational.fail(
            StoreOp::DeleteDependents(DependentKind::Label),
            StoreError::Constraint("label_votes_label_id_fkey".to_string()),
        );

        let err = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap_err();

        assert!(matches!(err, DeletionError::ConstraintViolation { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_dataset_row_failure_keeps_row_and_blob() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.relational.fail(
            StoreOp::DeleteDataset,
            StoreError::Rejected("permission denied".to_string()),
        );

        let err = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap_err();

        assert_eq!(err.failed_step(), Some(DeletionStep::DeleteDataset));
        assert!(matches!(err, DeletionError::PartiallyCompleted { .. }));
        assert!(fx.relational.dataset_exists(ds1));
        assert!(fx.objects.contains("csv/ds1.csv"));
        assert!(fx.objects.deleted_keys().is_empty());
    }

    #[tokio::test]
    async fn test_step_timeout_aborts() {
        let fx = fixture();
        let deleter = fx.deleter.clone().with_step_timeout(Duration::from_millis(20));
        let ds1 = seed_ds1(&fx.relational);
        fx.relational.delay(
            StoreOp::DeleteDependents(DependentKind::Progress),
            Duration::from_secs(5),
        );

        let err = deleter.delete_dataset(ds1, &owner()).await.unwrap_err();

        match err {
            DeletionError::PartiallyCompleted {
                failed_step, cause, ..
            } => {
                assert_eq!(failed_step, DeletionStep::DeleteProgress);
                assert_eq!(cause, StoreError::Timeout(Duration::from_millis(20)));
            },
            other => panic!("expected PartiallyCompleted, got {:?}", other),
        }
        assert!(fx.relational.dataset_exists(ds1));
        assert!(!fx.guard.is_held(ds1));
    }

    #[tokio::test]
    async fn test_blob_failure_is_warning_only() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        fx.objects
            .fail_deletes(StoreError::Unavailable("bucket offline".to_string()));

        let outcome = fx.deleter.delete_dataset(ds1, &owner()).await.unwrap();

        assert!(outcome.has_warning());
        let warning = outcome.blob_cleanup.warning().unwrap();
        assert_eq!(warning.key, "csv/ds1.csv");
        assert!(!fx.relational.dataset_exists(ds1));
        assert_eq!(fx.relational.orphans(), 0);
        assert!(fx.objects.contains("csv/ds1.csv"));
    }

    #[tokio::test]
    async fn test_blob_timeout_is_warning_only() {
        let fx = fixture();
        let deleter = fx.deleter.clone().with_step_timeout(Duration::from_millis(20));
        let ds1 = seed_ds1(&fx.relational);
        fx.objects.delay_deletes(Duration::from_secs(5));

        let outcome = deleter.delete_dataset(ds1, &owner()).await.unwrap();

        assert!(outcome.has_warning());
        assert!(!fx.relational.dataset_exists(ds1));
    }

    #[tokio::test]
    async fn test_dataset_without_file_skips_cleanup() {
        let fx = fixture();
        let id = fx.relational.seed(None, 1, 1, 0);

        let outcome = fx.deleter.delete_dataset(id, &owner()).await.unwrap();

        assert_eq!(outcome.blob_cleanup, BlobCleanup::Skipped);
        assert!(fx.objects.deleted_keys().is_empty());
    }

    #[tokio::test]
    async fn test_row_removed_between_lookup_and_delete() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        let gate = fx.relational.gate(StoreOp::DeleteDataset);

        let deleter = fx.deleter.clone();
        let task = tokio::spawn(async move { deleter.delete_dataset(ds1, &owner()).await });

        gate.entered.notified().await;
        fx.relational.remove_dataset_row(ds1);
        gate.resume.notify_one();

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.already_absent);
        assert_eq!(outcome.removed.datasets, 0);
        assert_eq!(outcome.removed.entries, 3);
    }

    #[tokio::test]
    async fn test_concurrent_delete_is_rejected() {
        let fx = fixture();
        let ds1 = seed_ds1(&fx.relational);
        let gate = fx
            .relational
            .gate(StoreOp::DeleteDependents(DependentKind::Label));

        let deleter = fx.deleter.clone();
        let first = tokio::spawn(async move { deleter.delete_dataset(ds1, &owner()).await });

        gate.entered.notified().await;
        let second = fx.deleter.delete_dataset(ds1, &owner()).await;
        assert!(matches!(
            second,
            Err(DeletionError::AlreadyInProgress { dataset_id }) if dataset_id == ds1
        ));

        gate.resume.notify_one();
        let outcome = first.await.unwrap().unwrap();

        assert_eq!(outcome.removed.total(), 2 + 3 + 1 + 1);
        assert_eq!(fx.relational.mutations(), DEPENDENT_ORDER.to_vec());
        assert!(!fx.guard.is_held(ds1));
    }

    #[tokio::test]
    async fn test_distinct_datasets_delete_concurrently() {
        let fx = fixture();
        let ids: Vec<_> = (0..8).map(|_| fx.relational.seed(None, 1, 2, 1)).collect();
        let actor = owner();

        let results = futures::future::join_all(
            ids.iter().map(|id| fx.deleter.delete_dataset(*id, &actor)),
        )
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(fx.relational.orphans(), 0);
        assert!(ids.iter().all(|id| !fx.relational.dataset_exists(*id)));
    }
}
