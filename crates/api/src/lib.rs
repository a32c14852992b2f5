//! HTTP API: server wiring, the authentication and authorization gates, and
//! the user/policy administration routes behind them.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
