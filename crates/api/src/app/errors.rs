use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use warden_auth::{PolicyError, RoleChangeError, StoreError};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Uniform 401; the specific reason never reaches the client.
pub fn unauthenticated() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing or invalid credential")
}

pub fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient permissions")
}

pub fn internal(message: impl Into<String>) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::UserNotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "user_not_found", format!("user {id} not found"))
        }
        e @ StoreError::RoleNotAssigned { .. } => {
            json_error(StatusCode::BAD_REQUEST, "role_not_assigned", e.to_string())
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Rejected(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage backend failure");
            internal("storage failure")
        }
    }
}

pub fn policy_error_to_response(err: PolicyError) -> Response {
    match err {
        e @ (PolicyError::InvalidPattern { .. } | PolicyError::InvalidAction(_)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_rule", e.to_string())
        }
        e @ PolicyError::UnknownRole(_) => json_error(StatusCode::NOT_FOUND, "unknown_role", e.to_string()),
        e @ PolicyError::RoleExists(_) => json_error(StatusCode::CONFLICT, "role_exists", e.to_string()),
        e @ PolicyError::UnknownRule { .. } => json_error(StatusCode::NOT_FOUND, "unknown_rule", e.to_string()),
    }
}

pub fn role_change_error_to_response(err: RoleChangeError) -> Response {
    match err {
        RoleChangeError::Unauthenticated(_) => unauthenticated(),
        RoleChangeError::Persistence(e) => store_error_to_response(e),
        RoleChangeError::Signing(e) => {
            tracing::error!(error = %e, "token reissue failed after role change");
            internal("role changed but no token could be issued")
        }
    }
}
