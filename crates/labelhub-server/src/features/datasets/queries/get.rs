use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use labelhub_common::types::DatasetId;

use crate::deletion::graph::{dependent_steps, DependentKind};
use crate::models::Dataset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetQuery {
    pub dataset_id: DatasetId,
}

/// Rows still referencing a dataset, per dependent kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentCounts {
    pub labels: i64,
    pub entries: i64,
    pub progress: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetResponse {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub dependents: DependentCounts,
}

#[derive(Debug, thiserror::Error)]
pub enum GetDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(DatasetId),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<GetDatasetResponse, GetDatasetError>> for GetDatasetQuery {}

impl crate::cqrs::middleware::Query for GetDatasetQuery {}

fn count_statement(kind: DependentKind) -> String {
    format!("SELECT COUNT(*) FROM {} WHERE dataset_id = $1", kind.table())
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: GetDatasetQuery,
) -> Result<GetDatasetResponse, GetDatasetError> {
    let dataset = sqlx::query_as::<_, Dataset>(
        r#"
        SELECT id, name, owner_id, total_entries, is_active, invite_code, file_path, created_at
        FROM datasets
        WHERE id = $1
        "#,
    )
    .bind(query.dataset_id.as_uuid())
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDatasetError::NotFound(query.dataset_id))?;

    let mut dependents = DependentCounts::default();
    for (_, kind) in dependent_steps() {
        let count: i64 = sqlx::query_scalar(&count_statement(kind))
            .bind(query.dataset_id.as_uuid())
            .fetch_one(&pool)
            .await?;

        match kind {
            DependentKind::Label => dependents.labels = count,
            DependentKind::Entry => dependents.entries = count,
            DependentKind::Progress => dependents.progress = count,
        }
    }

    Ok(GetDatasetResponse {
        dataset,
        dependents,
    })
}
