//! graphpath API Server
//!
//! REST server resolving resource chains over a graph store.
//!
//! Author: hephaex@gmail.com

use graphpath_api::{create_router, state::AppState};
use graphpath_core::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: a TOML file when GRAPHPATH_CONFIG is set, env overrides on top
    let config = match std::env::var("GRAPHPATH_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Load schema and seed graph
    let state = Arc::new(AppState::load(config).await?);
    if state.access.is_empty() {
        tracing::warn!("No access rules configured, only authenticated reads are allowed");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("graphpath API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "graphpath_api={level},graphpath_resource={level},graphpath_graph={level},tower_http={level}",
            level = logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
