//! Cascading dataset deletion
//!
//! Removing a dataset touches two stores with no shared transaction: the
//! relational rows (labels, entries, progress, the dataset itself) and the
//! uploaded file in the object store. [`DatasetDeleter`] runs the fixed
//! [`DATASET_DELETION_PLAN`]:
//!
//! 1. delete labels
//! 2. delete entries
//! 3. delete progress
//! 4. read the stored file path
//! 5. delete the dataset row
//! 6. remove the stored file (best-effort)
//!
//! Dependents go before their parent so no row ever references a missing
//! dataset. The path is read before the row that holds it is deleted. Every
//! relational step is a predicate delete, so re-running a failed or finished
//! deletion converges without double counting.
//!
//! # Example
//!
//! ```rust,ignore
//! let deleter = DatasetDeleter::new(
//!     Arc::new(PgRelationalStore::new(pool.clone())),
//!     Arc::new(storage),
//!     Arc::new(InMemoryDeletionGuard::new()),
//! );
//!
//! let outcome = deleter
//!     .delete_dataset(dataset_id, &AuthorizedPrincipal::owner(user_id))
//!     .await?;
//! ```

pub mod cleanup;
pub mod error;
pub mod executor;
pub mod graph;
pub mod guard;
pub mod orchestrator;
pub mod outcome;
pub mod principal;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cleanup::{remove_stored_file, ObjectStore};
pub use error::{DeletionError, StoreError};
pub use executor::{PgRelationalStore, RelationalStore};
pub use graph::{DeletionStep, DependentKind, DATASET_DELETION_PLAN};
pub use guard::{DeletionGuard, GuardPermit, InMemoryDeletionGuard, PgAdvisoryDeletionGuard};
pub use orchestrator::{DatasetDeleter, DEFAULT_STEP_TIMEOUT};
pub use outcome::{BlobCleanup, BlobCleanupWarning, DeletionOutcome, RemovedCounts};
pub use principal::{Authority, AuthorizedPrincipal};
