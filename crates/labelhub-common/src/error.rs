//! Error types for Labelhub

use thiserror::Error;

/// Result type alias for Labelhub operations
pub type Result<T> = std::result::Result<T, LabelhubError>;

/// Main error type for Labelhub
#[derive(Error, Debug)]
pub enum LabelhubError {
    #[error("Invalid dataset id '{0}'")]
    InvalidDatasetId(String),

    #[error("Invalid user id '{0}'")]
    InvalidUserId(String),
}
