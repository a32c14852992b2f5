//! Helpers shared by handlers.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use warden_auth::password::{self, PasswordError};
use warden_auth::{IssuedToken, PolicySnapshot, Role};

use crate::app::errors;

pub const NEW_TOKEN_HEADER: HeaderName = HeaderName::from_static("new-token");
pub const NEW_EXPIRES_AT_HEADER: HeaderName = HeaderName::from_static("new-expires-at");

/// Headers carrying a reissued token back to the acting client.
pub fn reissue_headers(issued: &IssuedToken) -> Result<HeaderMap, Response> {
    let token = HeaderValue::from_str(&issued.token)
        .map_err(|_| errors::internal("reissued token is not a valid header value"))?;
    let mut headers = HeaderMap::new();
    headers.insert(NEW_TOKEN_HEADER, token);
    headers.insert(NEW_EXPIRES_AT_HEADER, HeaderValue::from(issued.expires_at()));
    Ok(headers)
}

/// Parse role names and require each to exist in the current policy.
pub fn known_roles(names: &[String], policy: &PolicySnapshot) -> Result<Vec<Role>, Response> {
    names.iter().map(|name| known_role(name, policy)).collect()
}

pub fn known_role(name: &str, policy: &PolicySnapshot) -> Result<Role, Response> {
    let role = Role::parse(name)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()))?;
    if !policy.has_role(&role) {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "unknown_role",
            format!("role '{role}' is not defined by the current policy"),
        ));
    }
    Ok(role)
}

/// Argon2 is deliberately slow; keep it off the async workers.
pub async fn hash_password(plain: String) -> Result<String, Response> {
    match tokio::task::spawn_blocking(move || password::hash_password(&plain)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(PasswordError::Empty)) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password must not be empty",
        )),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "password hashing failed");
            Err(errors::internal("password hashing failed"))
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task failed");
            Err(errors::internal("password hashing failed"))
        }
    }
}

pub async fn verify_password(hash: String, plain: String) -> Result<bool, Response> {
    tokio::task::spawn_blocking(move || password::verify_password(&hash, &plain))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            errors::internal("password verification failed")
        })
}
