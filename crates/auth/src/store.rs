//! Storage collaborator as seen from the auth core.

use async_trait::async_trait;
use thiserror::Error;
use warden_core::UserId;

use crate::Role;

/// Failure reported by a storage collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("role '{role}' is not assigned to user {user}")]
    RoleNotAssigned { user: UserId, role: Role },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Role assignment persistence.
///
/// Implementations own retry policy, if any; the core calls each method once.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    /// Persist `role` as the active role of `user`.
    async fn set_active_role(&self, user: UserId, role: &Role) -> Result<(), StoreError>;

    /// Current active role of `user` according to storage.
    async fn active_role(&self, user: UserId) -> Result<Role, StoreError>;
}
