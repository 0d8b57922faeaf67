//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{health, rest};
use crate::state::AppState;
use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;

/// Probe routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
}

/// Resource chains below `/api`, any verb
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/*path", any(rest::rest_handler))
}
