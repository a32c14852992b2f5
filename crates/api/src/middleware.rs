//! Authentication gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use warden_auth::{AuthError, Claims, TokenCodec};

use crate::app::errors;
use crate::context::Identity;

/// Primary credential header.
pub const TOKEN_HEADER: &str = "x-token";

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
}

/// Verify the caller's token and attach an [`Identity`] to the request.
///
/// Every failure yields the same 401 body; the specific reason is only logged.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let verified = authenticate(&state.codec, req.headers(), Utc::now());

    match verified {
        Ok(claims) => {
            req.extensions_mut().insert(Identity::new(claims));
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(
                reason = e.reason(),
                method = %req.method(),
                path = %req.uri().path(),
                "authentication rejected"
            );
            errors::unauthenticated()
        }
    }
}

pub fn authenticate(
    codec: &TokenCodec,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Claims, AuthError> {
    let token = extract_token(headers)?;
    codec.decode(token, now)
}

/// `x-token` wins; `Authorization: Bearer` is the fallback.
fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let raw = match headers.get(TOKEN_HEADER) {
        Some(value) => value.to_str().map_err(|_| AuthError::MalformedToken)?,
        None => match headers.get(header::AUTHORIZATION) {
            Some(value) => {
                let value = value.to_str().map_err(|_| AuthError::MalformedToken)?;
                value
                    .strip_prefix("Bearer ")
                    .ok_or(AuthError::MalformedToken)?
            }
            None => return Err(AuthError::MissingCredential),
        },
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}
