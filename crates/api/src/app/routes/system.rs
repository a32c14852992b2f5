use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::app::services::AppServices;
use crate::context::Identity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller as its token describes it, next to what storage says now.
///
/// `stale` is true when the stored active role no longer matches the token.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let stored = services.users.active_role(identity.user_id()).await.ok();
    let stale = stored.as_ref() != Some(identity.role());
    let claims = identity.claims();

    Json(json!({
        "userId": identity.user_id(),
        "uuid": identity.user_uuid(),
        "username": claims.username(),
        "nickName": claims.nickname(),
        "authorityId": identity.role(),
        "storedAuthorityId": stored,
        "stale": stale,
        "expiresAt": claims.expires_at(),
    }))
}
