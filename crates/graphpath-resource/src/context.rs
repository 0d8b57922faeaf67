//! Request-scoped context
//!
//! Everything a resolution needs is passed explicitly through a
//! [`RequestContext`]; nothing is looked up from ambient state.

use graphpath_core::{EngineConfig, GraphStore, Schema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated caller, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Collaborators and inputs of one request
#[derive(Clone)]
pub struct RequestContext {
    pub store: Arc<dyn GraphStore>,
    pub schema: Arc<Schema>,
    pub engine: EngineConfig,
    /// Decoded query-string parameters in request order
    pub params: Vec<(String, String)>,
    pub principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(store: Arc<dyn GraphStore>, schema: Arc<Schema>, engine: EngineConfig) -> Self {
        Self {
            store,
            schema,
            engine,
            params: Vec::new(),
            principal: None,
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// First value of a query parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("store", &self.store.name())
            .field("params", &self.params)
            .field("principal", &self.principal)
            .finish()
    }
}
