//! Relational deletion executor
//!
//! Predicate deletes by dataset foreign key against Postgres. None of these
//! operations require the dataset to still exist, and matching zero rows is
//! success, so every call is safe to repeat.

use async_trait::async_trait;
use labelhub_common::types::DatasetId;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::StoreError;
use super::graph::DependentKind;

/// Relational operations the deletion protocol depends on
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Delete every row of `kind` referencing `dataset_id`; returns rows removed
    async fn delete_dependents(
        &self,
        kind: DependentKind,
        dataset_id: DatasetId,
    ) -> Result<u64, StoreError>;

    /// `None` when the dataset row is absent, `Some(None)` when it has no file
    async fn find_file_path(&self, dataset_id: DatasetId)
        -> Result<Option<Option<String>>, StoreError>;

    /// Delete the dataset row itself; returns rows removed (0 or 1)
    async fn delete_dataset(&self, dataset_id: DatasetId) -> Result<u64, StoreError>;
}

/// Run one store operation under the step timeout
pub(crate) async fn with_timeout<T, F>(timeout: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

/// Postgres-backed [`RelationalStore`]
#[derive(Clone)]
pub struct PgRelationalStore {
    pool: PgPool,
}

impl PgRelationalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn delete_statement(kind: DependentKind) -> &'static str {
        match kind {
            DependentKind::Label => "DELETE FROM dataset_labels WHERE dataset_id = $1",
            DependentKind::Entry => "DELETE FROM dataset_entries WHERE dataset_id = $1",
            DependentKind::Progress => "DELETE FROM label_progress WHERE dataset_id = $1",
        }
    }
}

#[async_trait]
impl RelationalStore for PgRelationalStore {
    #[instrument(skip(self), fields(table = kind.table()))]
    async fn delete_dependents(
        &self,
        kind: DependentKind,
        dataset_id: DatasetId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(Self::delete_statement(kind))
            .bind(dataset_id.as_uuid())
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Dependent rows deleted");

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn find_file_path(
        &self,
        dataset_id: DatasetId,
    ) -> Result<Option<Option<String>>, StoreError> {
        let path = sqlx::query_scalar::<_, Option<String>>(
            "SELECT file_path FROM datasets WHERE id = $1",
        )
        .bind(dataset_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(path)
    }

    #[instrument(skip(self))]
    async fn delete_dataset(&self, dataset_id: DatasetId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(dataset_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
