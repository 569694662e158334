//! Feature modules implementing the Labelhub API
//!
//! Each feature is a vertical slice following the CQRS pattern:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **datasets**: Dataset lookup and cascading deletion

pub mod datasets;

use axum::Router;
use sqlx::PgPool;

use crate::deletion::DatasetDeleter;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: PgPool,
    /// Dataset deletion protocol, shared by the owner and admin views
    pub deleter: DatasetDeleter,
}

/// Creates the API router with all feature routes mounted
///
/// - `/datasets` - Dataset lookup and owner deletion
/// - `/admin` - Admin deletion of any dataset
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/datasets", datasets::datasets_routes())
        .nest("/admin", datasets::admin_routes())
        .with_state(state)
}
