//! User profile and the user lookup contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::UserId;
use crate::shared::error::ServiceError;

/// Public profile of a user, as much as the realtime core needs.
///
/// Maps to `users (id, username, email)`; credentials never leave the
/// persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
}

/// Read-only user lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Find a user by id. `Ok(None)` when no such user exists.
    async fn find_by_id(&self, id: &str) -> Result<Option<UserProfile>, ServiceError>;
}
