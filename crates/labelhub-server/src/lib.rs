//! Labelhub Server Library
//!
//! HTTP server for a dataset-labeling application.
//!
//! # Overview
//!
//! - **Deletion**: cascading dataset deletion across Postgres and S3 with a
//!   per-dataset guard, step timeouts and retry-safe partial failures
//! - **API Endpoints**: dataset lookup plus owner and admin deletion
//! - **Database Management**: PostgreSQL integration with SQLx
//! - **Storage Backend**: S3-compatible object storage for uploaded files
//! - **Configuration**: Environment-based configuration management
//!
//! # Architecture
//!
//! Features follow a **CQRS** layout: commands change state, queries read it,
//! and both implement `mediator::Request`. The deletion protocol itself lives
//! in [`deletion`] and is shared by every trigger.
//!
//! # Example
//!
//! ```no_run
//! use labelhub_server::{api, config::Config, deletion, features::FeatureState};
//! use std::sync::Arc;
//!
//! # async fn run(pool: sqlx::PgPool, storage: labelhub_server::storage::Storage) -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let deleter = deletion::DatasetDeleter::new(
//!     Arc::new(deletion::PgRelationalStore::new(pool.clone())),
//!     Arc::new(storage),
//!     Arc::new(deletion::InMemoryDeletionGuard::new()),
//! )
//! .with_step_timeout(config.deletion.step_timeout());
//!
//! let app = api::create_router(FeatureState { db: pool, deleter }, &config);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod deletion;
pub mod error;
pub mod features;
pub mod middleware;
pub mod models;
pub mod storage;

pub use error::AppError;
