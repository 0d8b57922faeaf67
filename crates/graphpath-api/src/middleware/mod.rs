//! Request middleware
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod security_headers;

pub use auth::optional_auth_middleware;
pub use security_headers::security_headers_middleware;

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Count every request served
pub async fn request_counter_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    state.increment_requests();
    next.run(request).await
}
