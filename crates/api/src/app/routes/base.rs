//! Public endpoints: login.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::{IntoResponse, Response}};
use chrono::Utc;

use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::routes::common;
use crate::app::{errors, services::AppServices};

/// POST /base/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let user = match services.users.find_by_username(&req.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return invalid_credentials(),
        Err(e) => return errors::store_error_to_response(e),
    };

    match common::verify_password(user.password_hash.clone(), req.password).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return invalid_credentials();
        }
        Err(resp) => return resp,
    }

    let issued = match services.issuer.issue(user.subject(), Utc::now()) {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(error = %e, "token issue failed");
            return errors::internal("could not issue token");
        }
    };

    tracing::info!(user_id = %user.id, role = %user.active_role, "user logged in");
    (StatusCode::OK, Json(LoginResponse::new(user, issued))).into_response()
}

/// Same answer for unknown users and wrong passwords.
fn invalid_credentials() -> Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "username or password is incorrect",
    )
}
