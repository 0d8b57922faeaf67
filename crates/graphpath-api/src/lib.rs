//! graphpath API - REST server
//!
//! Serves resource chains such as `/api/Person/<id>/Company` over HTTP.
//! Every request is resolved against the loaded schema, checked against
//! the access rules of its signature and answered from the graph store.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use crate::middleware::{
    optional_auth_middleware, request_counter_middleware, security_headers_middleware,
};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware as axum_mw, Router};
use graphpath_core::{AppConfig, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
        handlers::rest::rest_handler,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::health::BuildInfo,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::health::MetricsResponse,
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "resources", description = "Resource chain resolution")
    )
)]
pub struct ApiDoc;

/// Build the application router around `state`
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = state.config.server.clone();

    let mut router = Router::new()
        .merge(routes::health_routes())
        .merge(routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            request_counter_middleware,
        ))
        .layer(axum_mw::from_fn(security_headers_middleware))
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    if server.cors_enabled {
        router = router.layer(cors_layer(&server));
    }

    router.with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Demo schema served by [`create_router_for_testing`]
pub const DEMO_SCHEMA: &str = include_str!("../../../demos/schema.toml");
/// Demo graph served by [`create_router_for_testing`]
pub const DEMO_FIXTURE: &str = include_str!("../../../demos/fixture.json");
/// Demo configuration, access rules included
pub const DEMO_CONFIG: &str = include_str!("../../../demos/graphpath.toml");

/// Router over the demo graph with the demo access rules
pub async fn create_router_for_testing() -> Router {
    create_router(Arc::new(demo_state().await))
}

/// State over the demo graph
///
/// # Panics
///
/// Panics if the bundled demo files do not parse.
pub async fn demo_state() -> AppState {
    use graphpath_core::Schema;
    use graphpath_graph::{load_fixture, Fixture, MemoryGraphStore};

    let config = AppConfig::from_toml_str(DEMO_CONFIG).expect("demo config parses");
    let schema = Arc::new(Schema::from_toml_str(DEMO_SCHEMA).expect("demo schema parses"));
    let store = Arc::new(MemoryGraphStore::new(schema.clone()));
    load_fixture(
        &store,
        Fixture::from_json_str(DEMO_FIXTURE).expect("demo fixture parses"),
    )
    .await
    .expect("demo fixture loads");

    AppState::new(config, schema, store)
}
