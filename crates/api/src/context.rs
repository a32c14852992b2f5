use std::sync::Arc;

use warden_auth::{Claims, Role};
use warden_core::{UserId, UserUuid};

/// Verified identity of the caller for one request.
///
/// Inserted by the authentication gate and read by the authorization gate and
/// handlers. Lives in the request's extensions and dies with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    claims: Arc<Claims>,
}

impl Identity {
    pub fn new(claims: Claims) -> Self {
        Self {
            claims: Arc::new(claims),
        }
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn user_id(&self) -> UserId {
        self.claims.user_id()
    }

    pub fn user_uuid(&self) -> UserUuid {
        self.claims.user_uuid()
    }

    /// The role this token acts as, which may lag behind storage.
    pub fn role(&self) -> &Role {
        self.claims.role()
    }
}
