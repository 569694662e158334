//! Who may delete a dataset
//!
//! The owner may delete their own dataset from the management view; admins
//! may delete any dataset from either view. The result is the
//! [`AuthorizedPrincipal`] the deletion protocol requires.

use labelhub_common::types::{DatasetId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use super::identity::RequestIdentity;
use crate::deletion::{AuthorizedPrincipal, StoreError};

/// Which trigger the deletion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionScope {
    /// Single-dataset management view
    Owner,
    /// All-datasets admin view
    Admin,
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Administrator role required")]
    AdminRequired,

    #[error("Only the owner or an administrator may delete dataset '{0}'")]
    NotOwner(DatasetId),

    #[error("Could not look up dataset owner: {0}")]
    OwnerLookup(#[from] StoreError),
}

/// Authorize `requester` to delete `dataset_id` from `scope`.
///
/// A dataset that no longer exists is authorized for any requester, so a
/// repeated delete reports the same idempotent success as the first.
#[tracing::instrument(skip(pool))]
pub async fn authorize_deletion(
    pool: &PgPool,
    dataset_id: DatasetId,
    requester: &RequestIdentity,
    scope: DeletionScope,
) -> Result<AuthorizedPrincipal, AuthorizationError> {
    if requester.is_admin || scope == DeletionScope::Admin {
        return decide(requester, scope, None);
    }

    let owner = find_owner(pool, dataset_id).await?;
    match owner {
        None => Ok(AuthorizedPrincipal::owner(requester.user_id)),
        Some(owner) => decide(requester, scope, Some((dataset_id, owner))),
    }
}

/// Pure decision once the owner (if needed) is known
fn decide(
    requester: &RequestIdentity,
    scope: DeletionScope,
    owned: Option<(DatasetId, UserId)>,
) -> Result<AuthorizedPrincipal, AuthorizationError> {
    if requester.is_admin {
        return Ok(AuthorizedPrincipal::admin(requester.user_id));
    }

    match (scope, owned) {
        (DeletionScope::Admin, _) => Err(AuthorizationError::AdminRequired),
        (DeletionScope::Owner, Some((_, owner))) if owner == requester.user_id => {
            Ok(AuthorizedPrincipal::owner(requester.user_id))
        },
        (DeletionScope::Owner, Some((dataset_id, _))) => {
            Err(AuthorizationError::NotOwner(dataset_id))
        },
        (DeletionScope::Owner, None) => Ok(AuthorizedPrincipal::owner(requester.user_id)),
    }
}

async fn find_owner(pool: &PgPool, dataset_id: DatasetId) -> Result<Option<UserId>, StoreError> {
    let owner = sqlx::query_scalar::<_, uuid::Uuid>("SELECT owner_id FROM datasets WHERE id = $1")
        .bind(dataset_id.as_uuid())
        .fetch_optional(pool)
        .await?;

    Ok(owner.map(UserId::from_uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deletion::Authority;
    use uuid::Uuid;

    fn requester(is_admin: bool) -> RequestIdentity {
        RequestIdentity {
            user_id: UserId::from_uuid(Uuid::new_v4()),
            is_admin,
        }
    }

    #[test]
    fn test_owner_may_delete_own_dataset() {
        let alice = requester(false);
        let dataset = DatasetId::new();

        let principal =
            decide(&alice, DeletionScope::Owner, Some((dataset, alice.user_id))).unwrap();

        assert_eq!(principal.user_id(), alice.user_id);
        assert_eq!(principal.authority(), Authority::Owner);
    }

    #[test]
    fn test_stranger_is_rejected() {
        let bob = requester(false);
        let dataset = DatasetId::new();
        let owner = UserId::from_uuid(Uuid::new_v4());

        let result = decide(&bob, DeletionScope::Owner, Some((dataset, owner)));

        assert!(matches!(result, Err(AuthorizationError::NotOwner(id)) if id == dataset));
    }

    #[test]
    fn test_admin_may_delete_anything() {
        let admin = requester(true);
        let owner = UserId::from_uuid(Uuid::new_v4());

        for scope in [DeletionScope::Owner, DeletionScope::Admin] {
            let principal = decide(&admin, scope, Some((DatasetId::new(), owner))).unwrap();
            assert_eq!(principal.authority(), Authority::Admin);
        }
    }

    #[test]
    fn test_admin_view_requires_admin() {
        let alice = requester(false);
        let result = decide(&alice, DeletionScope::Admin, None);
        assert!(matches!(result, Err(AuthorizationError::AdminRequired)));
    }

    #[test]
    fn test_absent_dataset_is_authorized() {
        let alice = requester(false);
        let principal = decide(&alice, DeletionScope::Owner, None).unwrap();
        assert_eq!(principal.authority(), Authority::Owner);
    }
}
