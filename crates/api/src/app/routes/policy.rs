//! Runtime policy inspection and editing.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use warden_auth::{PolicyRule, Role};

use crate::app::dto::{ExplainQuery, PolicyUpdateRequest, RoleRules};
use crate::app::{errors, services::AppServices};
use crate::context::Identity;

pub fn router() -> Router {
    Router::new()
        .route("/policy/explain", get(explain))
        .route("/policy/:role", get(get_role_rules).put(replace_role_rules))
}

fn parse_role(name: &str) -> Result<Role, Response> {
    Role::parse(name)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()))
}

/// GET /policy/explain?role=..&path=..&method=..
///
/// Why a given role would be allowed or denied, against the current snapshot.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<ExplainQuery>,
) -> Response {
    let role = match parse_role(&q.role) {
        Ok(role) => role,
        Err(resp) => return resp,
    };
    let decision = services.policy.explain(&role, &q.path, &q.method);
    (StatusCode::OK, Json(decision)).into_response()
}

/// GET /policy/:role
pub async fn get_role_rules(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> Response {
    let role = match parse_role(&name) {
        Ok(role) => role,
        Err(resp) => return resp,
    };
    let snapshot = services.policy.snapshot();
    match snapshot.rules_for(&role) {
        Some(rules) => (
            StatusCode::OK,
            Json(RoleRules {
                role: role.to_string(),
                version: snapshot.version(),
                rules,
            }),
        )
            .into_response(),
        None => errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_role",
            format!("role '{role}' is not defined"),
        ),
    }
}

/// PUT /policy/:role
///
/// Replaces every rule of the role. Rules are validated before anything is
/// stored, and storage must succeed before the live snapshot changes. Edits
/// are serialized end to end.
pub async fn replace_role_rules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Json(req): Json<PolicyUpdateRequest>,
) -> Response {
    let role = match parse_role(&name) {
        Ok(role) => role,
        Err(resp) => return resp,
    };

    let rules: Vec<PolicyRule> = req
        .rules
        .into_iter()
        .map(|r| PolicyRule::new(role.clone(), r.path, r.method))
        .collect();
    if let Some(err) = rules.iter().find_map(|r| r.compile().err()) {
        return errors::policy_error_to_response(err);
    }

    let _edit = services.policy_edits.lock().await;
    if let Err(e) = services.policy_store.save_role_rules(&role, &rules).await {
        return errors::store_error_to_response(e);
    }

    let snapshot = match services.policy.replace_role_rules(&role, &rules) {
        Ok(snapshot) => snapshot,
        Err(e) => return errors::policy_error_to_response(e),
    };

    tracing::info!(
        actor = %identity.user_id(),
        role = %role,
        rules = rules.len(),
        version = snapshot.version(),
        "policy rules replaced"
    );

    (
        StatusCode::OK,
        Json(RoleRules {
            role: role.to_string(),
            version: snapshot.version(),
            rules: snapshot.rules_for(&role).unwrap_or_default(),
        }),
    )
        .into_response()
}
