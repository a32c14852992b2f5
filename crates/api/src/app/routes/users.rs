//! User administration and role switching.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::json;

use warden_auth::{RoleChange, RoleChangeError, RoleChangeOutcome, change_role, is_self_change};
use warden_core::UserId;
use warden_infra::{NewUser, Page, ProfileUpdate};

use crate::app::dto::{
    ChangePasswordRequest, PageRequest, RegisterRequest, SetAuthoritiesRequest,
    SetAuthorityRequest, UpdateProfileRequest, UserPage,
};
use crate::app::routes::common;
use crate::app::{errors, services::AppServices};
use crate::context::Identity;

pub fn router() -> Router {
    Router::new()
        .route("/user/info", get(info))
        .route("/user/list", post(list))
        .route("/user/register", post(register))
        .route("/user/password", post(change_password))
        .route("/user/authority", post(set_own_authority))
        .route("/user/:id", put(update_profile).delete(delete_user))
        .route("/user/:id/authority", post(set_user_authority))
        .route("/user/:id/authorities", post(set_authorities))
}

/// GET /user/info
///
/// Looked up by the token's uuid, so a token outliving its user gets a 404.
pub async fn info(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    match services.users.find_by_uuid(identity.user_uuid()).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!({ "userInfo": user }))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "user_not_found", "user not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /user/list
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<PageRequest>,
) -> Response {
    let page = match Page::new(req.page, req.page_size) {
        Ok(page) => page,
        Err(e) => return errors::store_error_to_response(e),
    };
    match services.users.list(page).await {
        Ok((list, total)) => (
            StatusCode::OK,
            Json(UserPage {
                list,
                total,
                page: page.page,
                page_size: page.page_size,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /user/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let snapshot = services.policy.snapshot();
    let roles = match common::known_roles(&req.authority_ids, &snapshot) {
        Ok(roles) => roles,
        Err(resp) => return resp,
    };
    let active_role = match req.authority_id.as_deref() {
        Some(name) => match common::known_role(name, &snapshot) {
            Ok(role) => Some(role),
            Err(resp) => return resp,
        },
        None => None,
    };

    let password_hash = match common::hash_password(req.password).await {
        Ok(hash) => hash,
        Err(resp) => return resp,
    };

    let created = services
        .users
        .create(NewUser {
            username: req.username,
            password_hash,
            nickname: req.nick_name,
            header_img: req.header_img,
            roles,
            active_role,
        })
        .await;

    match created {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = %user.active_role, "user registered");
            (StatusCode::CREATED, Json(json!({ "user": user }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /user/password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Response {
    let user = match services.users.find_by_id(identity.user_id()).await {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e),
    };

    match common::verify_password(user.password_hash, req.password).await {
        Ok(true) => {}
        Ok(false) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "wrong_password",
                "current password is incorrect",
            );
        }
        Err(resp) => return resp,
    }

    let new_hash = match common::hash_password(req.new_password).await {
        Ok(hash) => hash,
        Err(resp) => return resp,
    };
    match services.users.set_password(user.id, new_hash).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "password changed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /user/authority: switch the caller's own active role.
pub async fn set_own_authority(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SetAuthorityRequest>,
) -> Response {
    let target = identity.user_id();
    apply_role_change(&services, &identity, target, &req.authority_id).await
}

/// POST /user/:id/authority: switch another user's active role.
pub async fn set_user_authority(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<u64>,
    Json(req): Json<SetAuthorityRequest>,
) -> Response {
    apply_role_change(&services, &identity, UserId::new(id), &req.authority_id).await
}

async fn apply_role_change(
    services: &AppServices,
    identity: &Identity,
    target: UserId,
    role_name: &str,
) -> Response {
    let role = match common::known_role(role_name, &services.policy.snapshot()) {
        Ok(role) => role,
        Err(resp) => return resp,
    };

    let outcome = change_role(
        identity.claims(),
        RoleChange {
            target,
            role: role.clone(),
        },
        services.users.as_ref(),
        &services.issuer,
        Utc::now(),
    )
    .await;

    let body = |reissued: bool| {
        Json(json!({
            "userId": target,
            "authorityId": role,
            "tokenReissued": reissued,
        }))
    };

    match outcome {
        Ok(RoleChangeOutcome::Reissued(issued)) => match common::reissue_headers(&issued) {
            Ok(headers) => (StatusCode::OK, headers, body(true)).into_response(),
            Err(resp) => resp,
        },
        Ok(RoleChangeOutcome::Persisted) => (StatusCode::OK, body(false)).into_response(),
        Err(e) => errors::role_change_error_to_response(e),
    }
}

/// POST /user/:id/authorities: replace the set of roles a user may act as.
///
/// If the caller replaces its own roles and loses its active role, the store
/// falls back to another role and the caller gets a token for it.
pub async fn set_authorities(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<u64>,
    Json(req): Json<SetAuthoritiesRequest>,
) -> Response {
    let roles = match common::known_roles(&req.authority_ids, &services.policy.snapshot()) {
        Ok(roles) => roles,
        Err(resp) => return resp,
    };

    let target = UserId::new(id);
    let user = match services.users.set_roles(target, roles).await {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e),
    };
    tracing::info!(
        actor = %identity.user_id(),
        user_id = %user.id,
        active = %user.active_role,
        "assigned roles replaced"
    );

    let acting_role_moved =
        is_self_change(identity.claims(), target) && &user.active_role != identity.role();
    if !acting_role_moved {
        return (StatusCode::OK, Json(json!({ "user": user, "tokenReissued": false }))).into_response();
    }

    let issued = match services
        .issuer
        .reissue_with_role(identity.claims(), user.active_role.clone(), Utc::now())
    {
        Ok(issued) => issued,
        Err(e) => return errors::role_change_error_to_response(RoleChangeError::from(e)),
    };
    match common::reissue_headers(&issued) {
        Ok(headers) => (
            StatusCode::OK,
            headers,
            Json(json!({ "user": user, "tokenReissued": true })),
        )
            .into_response(),
        Err(resp) => resp,
    }
}

/// PUT /user/:id
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateProfileRequest>,
) -> Response {
    let update = ProfileUpdate {
        nickname: req.nick_name,
        header_img: req.header_img,
    };
    match services.users.update_profile(UserId::new(id), update).await {
        Ok(user) => (StatusCode::OK, Json(json!({ "user": user }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /user/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<u64>,
) -> Response {
    let target = UserId::new(id);
    if target == identity.user_id() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "cannot_delete_self",
            "a user cannot delete itself",
        );
    }
    match services.users.delete(target).await {
        Ok(()) => {
            tracing::info!(actor = %identity.user_id(), user_id = %target, "user deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
