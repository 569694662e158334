use mediator::Request;
use serde::Serialize;
use sqlx::PgPool;

use labelhub_common::types::DatasetId;

use crate::deletion::{DatasetDeleter, DeletionError, DeletionOutcome};
use crate::features::datasets::authorization::{
    authorize_deletion, AuthorizationError, DeletionScope,
};
use crate::features::datasets::identity::RequestIdentity;

/// Delete a dataset with everything that depends on it
#[derive(Debug, Clone, Serialize)]
pub struct DeleteDatasetCommand {
    pub dataset_id: DatasetId,
    pub requester: RequestIdentity,
    pub scope: DeletionScope,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteDatasetError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Deletion(#[from] DeletionError),
}

impl Request<Result<DeletionOutcome, DeleteDatasetError>> for DeleteDatasetCommand {}

impl crate::cqrs::middleware::Command for DeleteDatasetCommand {}

#[tracing::instrument(
    skip(pool, deleter, command),
    fields(dataset_id = %command.dataset_id, requester = %command.requester.user_id, scope = ?command.scope)
)]
pub async fn handle(
    pool: PgPool,
    deleter: DatasetDeleter,
    command: DeleteDatasetCommand,
) -> Result<DeletionOutcome, DeleteDatasetError> {
    let principal =
        authorize_deletion(&pool, command.dataset_id, &command.requester, command.scope).await?;

    let outcome = deleter.delete_dataset(command.dataset_id, &principal).await?;

    Ok(outcome)
}
