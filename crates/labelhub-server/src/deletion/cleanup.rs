//! Object store cleanup
//!
//! Removal of a dataset's uploaded file. The relational state is
//! authoritative, so a failure here is reported as a warning on an otherwise
//! successful deletion and the blob is left for an out-of-band sweep.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use super::error::StoreError;
use super::executor::with_timeout;
use super::outcome::{BlobCleanup, BlobCleanupWarning};

/// Blob storage operations the deletion protocol depends on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Delete the object at `key`. Deleting a missing key is success.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}

/// Best-effort removal of the stored file at `path`. Never fails.
pub async fn remove_stored_file(
    store: &dyn ObjectStore,
    path: Option<&str>,
    timeout: Duration,
) -> BlobCleanup {
    let Some(key) = path.filter(|key| !key.trim().is_empty()) else {
        return BlobCleanup::Skipped;
    };

    match with_timeout(timeout, store.delete_object(key)).await {
        Ok(()) => {
            info!(key = %key, "Stored file removed");
            BlobCleanup::Removed {
                key: key.to_string(),
            }
        },
        Err(err) => {
            warn!(key = %key, error = %err, "Stored file could not be removed; leaving it for a sweep");
            BlobCleanup::Warning(BlobCleanupWarning {
                key: key.to_string(),
                reason: err.to_string(),
            })
        },
    }
}
