//! Labelhub Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Labelhub project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Labelhub workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: Shared identifiers such as [`types::DatasetId`]
//!
//! # Example
//!
//! ```no_run
//! use labelhub_common::types::DatasetId;
//! use labelhub_common::{LabelhubError, Result};
//!
//! fn parse(raw: &str) -> Result<DatasetId> {
//!     raw.parse()
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{LabelhubError, Result};
