//! Application state management
//!
//! Author: hephaex@gmail.com

use graphpath_core::{AppConfig, GraphStore, Schema};
use graphpath_graph::{load_fixture, Fixture, MemoryGraphStore};
use graphpath_resource::{AccessRules, Principal, RequestContext};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Loaded schema
    pub schema: Arc<Schema>,
    /// Graph store backing every resource
    pub store: Arc<dyn GraphStore>,
    /// Access rules keyed by resource signature
    pub access: AccessRules,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create state around an existing store
    pub fn new(config: AppConfig, schema: Arc<Schema>, store: Arc<dyn GraphStore>) -> Self {
        let access = AccessRules::from_config(&config.access);
        Self {
            config,
            schema,
            store,
            access,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Load the schema and the optional fixture named by the configuration
    /// into a fresh in-memory store
    pub async fn load(config: AppConfig) -> anyhow::Result<Self> {
        let schema = match &config.storage.schema_path {
            Some(path) => Schema::from_file(path)?,
            None => {
                warn!("No schema configured, starting with an empty schema");
                Schema::default()
            }
        };
        let schema = Arc::new(schema);
        let store = Arc::new(MemoryGraphStore::new(schema.clone()));

        if let Some(path) = &config.storage.fixture_path {
            load_fixture(&store, Fixture::from_file(path)?).await?;
        }
        info!(
            types = schema.types.len(),
            relationships = schema.relationships.len(),
            nodes = store.node_count().await,
            "Graph loaded"
        );

        Ok(Self::new(config, schema, store))
    }

    /// Context for one request
    pub fn request_context(
        &self,
        params: Vec<(String, String)>,
        principal: Option<Principal>,
    ) -> RequestContext {
        RequestContext::new(
            self.store.clone(),
            self.schema.clone(),
            self.config.engine.clone(),
        )
        .with_params(params)
        .with_principal(principal)
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
