use axum::{
    Router,
    routing::{get, post},
};

pub mod base;
pub mod common;
pub mod policy;
pub mod system;
pub mod users;

/// Endpoints reachable without a credential.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/base/login", post(base::login))
}

/// Endpoints behind authentication and the policy gate.
pub fn private_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(users::router())
        .merge(policy::router())
}
