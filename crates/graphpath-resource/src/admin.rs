//! Administrative resources: maintenance commands, schema introspection and
//! raw store queries

use crate::context::RequestContext;
use crate::entity::{body_properties, TypeResource};
use crate::resource::{ResourceKind, RestResource, Verb};
use crate::result::ResourceResult;
use async_trait::async_trait;
use graphpath_core::{GraphObject, GraphPathError, MaintenanceCommand, Result};
use serde_json::Value;
use tracing::info;

// ============================================================================
// Maintenance
// ============================================================================

/// `maintenance[/<command>]`
#[derive(Debug, Clone)]
pub struct MaintenanceResource {
    pub command: Option<MaintenanceCommand>,
    uri_part: String,
}

impl MaintenanceResource {
    pub fn new(command: Option<MaintenanceCommand>, segment: &str) -> Self {
        Self {
            command,
            uri_part: segment.to_string(),
        }
    }

    /// Narrow `maintenance` down to one command
    pub fn with_command(self, command: MaintenanceCommand, segment: &str) -> Self {
        Self {
            command: Some(command),
            uri_part: format!("{}/{segment}", self.uri_part),
        }
    }

    fn command_for(&self, body: &Value) -> Result<MaintenanceCommand> {
        if let Some(command) = self.command {
            return Ok(command);
        }
        body.get("command")
            .and_then(Value::as_str)
            .and_then(MaintenanceCommand::from_segment)
            .ok_or_else(|| GraphPathError::InvalidRequest("Missing maintenance command".into()))
    }
}

#[async_trait]
impl RestResource for MaintenanceResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Maintenance
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn supports(&self, verb: Verb) -> bool {
        verb == Verb::Post
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let command = self.command_for(body)?;
        let mut params = body_properties(body)?;
        params.remove("command");

        info!(command = %command, store = ctx.store.name(), "Running maintenance command");
        let outcome = ctx.store.run_maintenance(command, &params).await?;
        Ok(ResourceResult::single(GraphObject::Value(outcome)))
    }
}

// ============================================================================
// Schema
// ============================================================================

/// `_schema[/<Type>]`
#[derive(Debug, Clone)]
pub struct SchemaResource {
    pub entity_type: Option<String>,
    uri_part: String,
}

impl SchemaResource {
    pub fn new(segment: &str) -> Self {
        Self {
            entity_type: None,
            uri_part: segment.to_string(),
        }
    }

    /// Narrow the description down to one type
    pub fn for_type(self, ty: &TypeResource) -> Self {
        Self {
            entity_type: Some(ty.name.clone()),
            uri_part: format!("{}/{}", self.uri_part, ty.uri_part()),
        }
    }
}

#[async_trait]
impl RestResource for SchemaResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Schema
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        self.entity_type.is_none()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        match &self.entity_type {
            Some(name) => ctx
                .schema
                .describe_type(name)
                .map(|description| ResourceResult::single(GraphObject::Value(description)))
                .ok_or_else(|| GraphPathError::not_found(format!("Type {name}"))),
            None => Ok(ResourceResult::collection(
                ctx.schema
                    .types
                    .iter()
                    .filter_map(|ty| ctx.schema.describe_type(&ty.name))
                    .map(GraphObject::Value)
                    .collect(),
            )),
        }
    }
}

// ============================================================================
// Cypher
// ============================================================================

/// `cypher`: hands `{query, params}` to the store's native query language
#[derive(Debug, Clone)]
pub struct CypherResource {
    uri_part: String,
}

impl CypherResource {
    pub fn new(segment: &str) -> Self {
        Self {
            uri_part: segment.to_string(),
        }
    }
}

#[async_trait]
impl RestResource for CypherResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cypher
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn supports(&self, verb: Verb) -> bool {
        verb == Verb::Post
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| GraphPathError::InvalidRequest("Missing query".into()))?;
        let params = match body.get("params") {
            Some(params) => body_properties(params)?,
            None => Default::default(),
        };

        let rows = ctx.store.execute_query(query, &params).await?;
        Ok(ResourceResult::collection(rows))
    }
}
