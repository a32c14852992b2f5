//! Authorization gate: decides each authenticated request against the
//! current policy snapshot.
//!
//! Runs after [`crate::middleware::auth_middleware`]; a request that reaches
//! the handler has been allowed by exactly one snapshot.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use warden_auth::PolicyEngine;

use crate::app::errors;
use crate::context::Identity;

#[derive(Clone)]
pub struct AuthzState {
    pub policy: Arc<PolicyEngine>,
}

pub async fn authz_middleware(
    State(state): State<AuthzState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(identity) = req.extensions().get::<Identity>().cloned() else {
        // Wiring bug: the authentication layer must run first.
        tracing::error!(path = %req.uri().path(), "authorization reached without identity");
        return errors::forbidden();
    };

    let path = req.uri().path();
    let method = req.method().as_str();

    if !state.policy.is_allowed(identity.role(), path, method) {
        tracing::info!(
            user_id = %identity.user_id(),
            role = %identity.role(),
            path,
            method,
            "request denied by policy"
        );
        return errors::forbidden();
    }

    next.run(req).await
}
