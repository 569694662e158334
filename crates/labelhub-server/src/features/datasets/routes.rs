//! Dataset API routes
//!
//! # Route Structure
//!
//! - `GET /api/v1/datasets/:id` - Get a dataset with its dependent row counts
//! - `DELETE /api/v1/datasets/:id` - Delete a dataset (owner management view)
//! - `DELETE /api/v1/admin/datasets/:id` - Delete a dataset (admin view)
//!
//! Both delete routes run the same command and deletion protocol.

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::deletion::DeletionError;
use crate::error::AppError;
use crate::features::FeatureState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use labelhub_common::types::DatasetId;
use serde_json::json;

use super::{
    authorization::{AuthorizationError, DeletionScope},
    commands::{DeleteDatasetCommand, DeleteDatasetError},
    identity::RequestIdentity,
    queries::{GetDatasetError, GetDatasetQuery},
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Routes mounted under `/datasets`
pub fn datasets_routes() -> Router<FeatureState> {
    Router::new().route("/:id", get(get_dataset).delete(delete_own_dataset))
}

/// Routes mounted under `/admin`
pub fn admin_routes() -> Router<FeatureState> {
    Router::new().route("/datasets/:id", delete(delete_any_dataset))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Delete a dataset from the owner's management view
///
/// # Response
///
/// - `200 OK` - Dataset deleted, or already absent. A stored file that could
///   not be removed is reported as `blob_cleanup.status = "warning"`.
/// - `401 Unauthorized` - Missing or malformed `x-user-id`
/// - `403 Forbidden` - Requester is neither owner nor admin
/// - `409 Conflict` - Deletion already running, or rejected by a constraint
/// - `500 Internal Server Error` - Deletion stopped part way; safe to retry
/// - `503 Service Unavailable` - Store unreachable; nothing was removed
#[tracing::instrument(skip(state, requester), fields(dataset_id = %id))]
async fn delete_own_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<String>,
    requester: RequestIdentity,
) -> Result<Response, DatasetApiError> {
    run_delete(state, &id, requester, DeletionScope::Owner).await
}

/// Delete any dataset from the admin view. Requires `x-user-role: admin`.
#[tracing::instrument(skip(state, requester), fields(dataset_id = %id))]
async fn delete_any_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<String>,
    requester: RequestIdentity,
) -> Result<Response, DatasetApiError> {
    run_delete(state, &id, requester, DeletionScope::Admin).await
}

async fn run_delete(
    state: FeatureState,
    id: &str,
    requester: RequestIdentity,
    scope: DeletionScope,
) -> Result<Response, DatasetApiError> {
    let dataset_id: DatasetId = id.parse().map_err(AppError::from)?;

    let command = DeleteDatasetCommand {
        dataset_id,
        requester,
        scope,
    };

    let outcome = super::commands::delete::handle(state.db, state.deleter, command).await?;

    tracing::info!(
        dataset_id = %outcome.dataset_id,
        removed = %outcome.removed,
        warning = outcome.has_warning(),
        "Dataset deleted via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(outcome))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a dataset by id
///
/// # Response
///
/// - `200 OK` - Dataset with dependent row counts
/// - `400 Bad Request` - Malformed id
/// - `404 Not Found` - No such dataset
#[tracing::instrument(skip(state), fields(dataset_id = %id))]
async fn get_dataset(
    State(state): State<FeatureState>,
    Path(id): Path<String>,
) -> Result<Response, DatasetApiError> {
    let dataset_id: DatasetId = id.parse().map_err(AppError::from)?;

    let response = super::queries::get::handle(state.db, GetDatasetQuery { dataset_id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for dataset API endpoints
#[derive(Debug)]
enum DatasetApiError {
    Request(AppError),
    Delete(DeleteDatasetError),
    Get(GetDatasetError),
}

impl From<AppError> for DatasetApiError {
    fn from(err: AppError) -> Self {
        Self::Request(err)
    }
}

impl From<DeleteDatasetError> for DatasetApiError {
    fn from(err: DeleteDatasetError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetDatasetError> for DatasetApiError {
    fn from(err: GetDatasetError) -> Self {
        Self::Get(err)
    }
}

fn error_response(status: StatusCode, error: ErrorResponse) -> Response {
    (status, Json(error)).into_response()
}

fn deletion_error_response(err: DeletionError) -> Response {
    let message = err.to_string();
    let retryable = err.is_retryable();

    match err {
        DeletionError::AlreadyInProgress { dataset_id } => error_response(
            StatusCode::CONFLICT,
            ErrorResponse::with_details(
                "DELETION_IN_PROGRESS",
                message,
                json!({ "dataset_id": dataset_id, "retryable": retryable }),
            ),
        ),
        DeletionError::GuardUnavailable { dataset_id, .. } => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::with_details(
                "STORE_UNAVAILABLE",
                message,
                json!({ "dataset_id": dataset_id, "retryable": retryable }),
            ),
        ),
        DeletionError::StoreUnavailable { step, .. } => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::with_details(
                "STORE_UNAVAILABLE",
                message,
                json!({ "step": step, "retryable": retryable }),
            ),
        ),
        DeletionError::ConstraintViolation { step, .. } => error_response(
            StatusCode::CONFLICT,
            ErrorResponse::with_details(
                "CONSTRAINT_VIOLATION",
                message,
                json!({ "step": step, "retryable": retryable }),
            ),
        ),
        DeletionError::PartiallyCompleted {
            failed_step,
            removed,
            ..
        } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_details(
                "DELETION_INCOMPLETE",
                message,
                json!({
                    "failed_step": failed_step,
                    "removed": removed,
                    "retry_safe": true,
                    "retryable": retryable,
                }),
            ),
        ),
    }
}

impl IntoResponse for DatasetApiError {
    fn into_response(self) -> Response {
        match self {
            DatasetApiError::Request(err) => err.into_response(),

            // Delete errors
            DatasetApiError::Delete(DeleteDatasetError::Authorization(
                err @ (AuthorizationError::AdminRequired | AuthorizationError::NotOwner(_)),
            )) => error_response(
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", err.to_string()),
            ),
            DatasetApiError::Delete(DeleteDatasetError::Authorization(
                AuthorizationError::OwnerLookup(cause),
            )) => {
                tracing::error!("Owner lookup failed: {}", cause);
                let status = if cause.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                error_response(
                    status,
                    ErrorResponse::new("STORE_UNAVAILABLE", "Could not verify dataset ownership"),
                )
            },
            DatasetApiError::Delete(DeleteDatasetError::Deletion(err)) => {
                deletion_error_response(err)
            },

            // Get errors
            DatasetApiError::Get(GetDatasetError::NotFound(id)) => error_response(
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("Dataset '{}' not found", id)),
            ),
            DatasetApiError::Get(GetDatasetError::Database(err)) => {
                AppError::Database(err).into_response()
            },
        }
    }
}
