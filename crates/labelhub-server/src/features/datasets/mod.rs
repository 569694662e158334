//! Dataset management: read a dataset, delete it from the owner or admin view

pub mod authorization;
pub mod commands;
pub mod identity;
pub mod queries;
pub mod routes;

pub use authorization::{authorize_deletion, AuthorizationError, DeletionScope};
pub use commands::{DeleteDatasetCommand, DeleteDatasetError};
pub use identity::RequestIdentity;
pub use queries::{DependentCounts, GetDatasetError, GetDatasetQuery, GetDatasetResponse};
pub use routes::{admin_routes, datasets_routes};
