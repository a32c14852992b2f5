//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: process state (stores, policy engine, token issuer)
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response shapes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::authz::{self, AuthzState};
use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (entrypoint used by `main.rs` and tests).
///
/// Private routes pass authentication, then authorization, then the handler.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = AuthState {
        codec: services.issuer.codec().clone(),
    };
    let authz_state = AuthzState {
        policy: services.policy.clone(),
    };

    // Layers wrap outward: the last one added runs first.
    let private = routes::private_router()
        .layer(from_fn_with_state(authz_state, authz::authz_middleware))
        .layer(from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .merge(routes::public_router())
        .merge(private)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
