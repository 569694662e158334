//! Pre-authorized caller of the deletion protocol

use labelhub_common::types::UserId;
use serde::Serialize;

/// Why the caller may delete the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    Owner,
    Admin,
}

/// A user already cleared to delete a specific dataset.
///
/// Produced by the authorization layer; the deletion protocol trusts it and
/// performs no checks of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedPrincipal {
    user_id: UserId,
    authority: Authority,
}

impl AuthorizedPrincipal {
    pub fn owner(user_id: UserId) -> Self {
        Self {
            user_id,
            authority: Authority::Owner,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            authority: Authority::Admin,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }
}
