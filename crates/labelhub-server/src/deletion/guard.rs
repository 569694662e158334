//! Per-dataset deletion guard
//!
//! At most one deletion sequence runs for a dataset id at a time. A second
//! request for the same id is rejected, never queued or interleaved.
//!
//! - [`InMemoryDeletionGuard`]: process-local, for single-instance deployments
//! - [`PgAdvisoryDeletionGuard`]: Postgres session advisory lock, shared by
//!   every instance that talks to the same database

use async_trait::async_trait;
use labelhub_common::types::DatasetId;
use parking_lot::Mutex;
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::StoreError;

/// Mutual exclusion for dataset deletions
#[async_trait]
pub trait DeletionGuard: Send + Sync {
    /// Claim `dataset_id`; `Ok(None)` when another deletion holds it
    async fn try_acquire(&self, dataset_id: DatasetId) -> Result<Option<GuardPermit>, StoreError>;
}

#[async_trait]
trait HeldLock: Send {
    async fn release(self: Box<Self>);
}

/// Proof that the holder owns a dataset's deletion slot.
///
/// Call [`GuardPermit::release`] when done; dropping the permit releases it
/// as well (the advisory variant by closing its database session).
pub struct GuardPermit {
    dataset_id: DatasetId,
    lock: Option<Box<dyn HeldLock>>,
}

impl GuardPermit {
    fn new(dataset_id: DatasetId, lock: impl HeldLock + 'static) -> Self {
        Self {
            dataset_id,
            lock: Some(Box::new(lock)),
        }
    }

    pub fn dataset_id(&self) -> DatasetId {
        self.dataset_id
    }

    pub async fn release(mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release().await;
            debug!(dataset_id = %self.dataset_id, "Deletion guard released");
        }
    }
}

impl std::fmt::Debug for GuardPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardPermit")
            .field("dataset_id", &self.dataset_id)
            .field("held", &self.lock.is_some())
            .finish()
    }
}

// ============================================================================
// In-memory guard
// ============================================================================

/// Process-local guard backed by a set of in-flight dataset ids
#[derive(Clone, Default)]
pub struct InMemoryDeletionGuard {
    in_flight: Arc<Mutex<HashSet<DatasetId>>>,
}

impl InMemoryDeletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, dataset_id: DatasetId) -> bool {
        self.in_flight.lock().contains(&dataset_id)
    }
}

#[async_trait]
impl DeletionGuard for InMemoryDeletionGuard {
    async fn try_acquire(&self, dataset_id: DatasetId) -> Result<Option<GuardPermit>, StoreError> {
        if !self.in_flight.lock().insert(dataset_id) {
            return Ok(None);
        }

        Ok(Some(GuardPermit::new(
            dataset_id,
            MemoryLock {
                in_flight: Arc::clone(&self.in_flight),
                dataset_id,
            },
        )))
    }
}

struct MemoryLock {
    in_flight: Arc<Mutex<HashSet<DatasetId>>>,
    dataset_id: DatasetId,
}

#[async_trait]
impl HeldLock for MemoryLock {
    async fn release(self: Box<Self>) {}
}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.dataset_id);
    }
}

// ============================================================================
// Postgres advisory lock guard
// ============================================================================

/// Guard backed by `pg_try_advisory_lock` on a dedicated pooled connection.
///
/// Session-level advisory locks are re-entrant per session, so the permit
/// keeps its connection checked out until release. Give the guard its own
/// pool: permits sharing the pool the deletion steps run on would starve
/// those steps once every connection holds a lock. The pool size caps
/// concurrent deletions; extra requests wait for a session up to the pool's
/// acquire timeout.
#[derive(Clone)]
pub struct PgAdvisoryDeletionGuard {
    pool: PgPool,
}

impl PgAdvisoryDeletionGuard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletionGuard for PgAdvisoryDeletionGuard {
    async fn try_acquire(&self, dataset_id: DatasetId) -> Result<Option<GuardPermit>, StoreError> {
        let key = dataset_id.lock_key();
        let mut conn = self.pool.acquire().await?;

        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;

        if !locked {
            debug!(dataset_id = %dataset_id, key, "Advisory lock held elsewhere");
            return Ok(None);
        }

        Ok(Some(GuardPermit::new(
            dataset_id,
            AdvisoryLock {
                conn: Some(conn),
                key,
            },
        )))
    }
}

struct AdvisoryLock {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
}

#[async_trait]
impl HeldLock for AdvisoryLock {
    async fn release(self: Box<Self>) {
        let mut this = self;
        let Some(mut conn) = this.conn.take() else {
            return;
        };

        let unlocked = sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
            .bind(this.key)
            .fetch_one(&mut *conn)
            .await;

        match unlocked {
            Ok(true) => {},
            Ok(false) => warn!(key = this.key, "Advisory lock was not held at release"),
            Err(e) => {
                // Closing the session drops every lock it holds.
                warn!(key = this.key, error = %e, "Advisory unlock failed; closing session");
                drop(conn.detach());
            },
        }
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}
