//! Changing a user's active role.
//!
//! Tokens are stateless, so a role change only reaches a client through a
//! new token. The acting session gets one in-band when it changes its own
//! role. Any other user keeps acting under the old role until their token
//! expires; there is no server-side revocation.

use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_core::UserId;

use crate::store::{RoleAssignmentStore, StoreError};
use crate::{AuthError, Claims, IssuedToken, Role, SigningError, TokenIssuer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub target: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChangeOutcome {
    /// The actor changed its own role and must switch to this token.
    Reissued(IssuedToken),
    /// Another user's role changed; their outstanding tokens are untouched.
    Persisted,
}

impl RoleChangeOutcome {
    pub fn reissued(&self) -> Option<&IssuedToken> {
        match self {
            RoleChangeOutcome::Reissued(issued) => Some(issued),
            RoleChangeOutcome::Persisted => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleChangeError {
    #[error("acting credential rejected: {0}")]
    Unauthenticated(AuthError),

    #[error("role assignment not persisted: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// `true` when the change targets the acting user.
///
/// Identity is the numeric subject id; a zero id never matches anything.
pub fn is_self_change(actor: &Claims, target: UserId) -> bool {
    !actor.user_id().is_unset() && actor.user_id() == target
}

/// Validate the actor, persist the change, and reissue for self-changes.
///
/// Nothing is issued unless the store accepted the new role.
pub async fn change_role<S>(
    actor: &Claims,
    change: RoleChange,
    store: &S,
    issuer: &TokenIssuer,
    now: DateTime<Utc>,
) -> Result<RoleChangeOutcome, RoleChangeError>
where
    S: RoleAssignmentStore + ?Sized,
{
    actor
        .check_window(now)
        .map_err(RoleChangeError::Unauthenticated)?;
    if actor.user_id().is_unset() || actor.user_uuid().is_nil() {
        return Err(RoleChangeError::Unauthenticated(AuthError::MalformedToken));
    }

    store.set_active_role(change.target, &change.role).await?;

    tracing::info!(
        actor = %actor.user_id(),
        target = %change.target,
        role = %change.role,
        "active role changed"
    );

    if !is_self_change(actor, change.target) {
        return Ok(RoleChangeOutcome::Persisted);
    }

    let issued = issuer.reissue_with_role(actor, change.role, now)?;
    Ok(RoleChangeOutcome::Reissued(issued))
}
