//! Storage boundary
//!
//! The engines never touch storage directly; everything goes through
//! [`GraphStore`]. Implementations synchronise internally and may be shared
//! by many concurrent requests.

use crate::{
    Direction, Entity, GraphObject, GraphPathError, GraphPath, PathEvaluator, PropertyMap,
    Query, Relationship, Result, TraversalDescription,
};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Administrative commands reachable through the maintenance resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceCommand {
    RebuildIndex,
    ClearDatabase,
}

impl MaintenanceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RebuildIndex => "rebuildIndex",
            Self::ClearDatabase => "clearDatabase",
        }
    }

    /// Recognise a command name as it appears in a path
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "rebuildIndex" => Some(Self::RebuildIndex),
            "clearDatabase" => Some(Self::ClearDatabase),
            _ => None,
        }
    }
}

impl std::fmt::Display for MaintenanceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for graph store operations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Get a node by entity reference
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Entity>>;

    /// Get a node by internal numeric id
    async fn find_by_node_id(&self, node_id: u64) -> Result<Option<Entity>>;

    /// Get a relationship by entity reference
    async fn find_relationship(&self, uuid: Uuid) -> Result<Option<Relationship>>;

    /// Get a relationship by internal numeric id
    async fn find_relationship_by_id(&self, rel_id: u64) -> Result<Option<Relationship>>;

    /// Evaluate an attribute tree (with its sort and page clauses)
    async fn search(&self, query: &Query) -> Result<Vec<Entity>>;

    /// Run a traversal from `start`, returning every included path
    async fn traverse(
        &self,
        start: Uuid,
        description: &TraversalDescription,
        evaluator: &dyn PathEvaluator,
    ) -> Result<Vec<GraphPath>>;

    /// Relationships touching `node` in `direction`, optionally of one type
    async fn relationships(
        &self,
        node: Uuid,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>>;

    /// Every relationship of one type
    async fn relationships_of_type(&self, rel_type: &str) -> Result<Vec<Relationship>>;

    /// Store a new node
    async fn create_node(&self, entity_type: &str, properties: PropertyMap) -> Result<Entity>;

    /// Merge properties into an existing node
    async fn update_node(&self, uuid: Uuid, properties: PropertyMap) -> Result<Entity>;

    /// Remove a node together with its relationships
    async fn delete_node(&self, uuid: Uuid) -> Result<()>;

    /// Store a new relationship
    async fn create_relationship(
        &self,
        rel_type: &str,
        source: Uuid,
        target: Uuid,
        properties: PropertyMap,
    ) -> Result<Relationship>;

    /// Merge properties into an existing relationship
    async fn update_relationship(&self, uuid: Uuid, properties: PropertyMap)
        -> Result<Relationship>;

    /// Remove a relationship
    async fn delete_relationship(&self, uuid: Uuid) -> Result<()>;

    /// Run an administrative command
    async fn run_maintenance(
        &self,
        command: MaintenanceCommand,
        params: &PropertyMap,
    ) -> Result<Value>;

    /// Execute a raw query in the store's native language
    async fn execute_query(&self, query: &str, _params: &PropertyMap) -> Result<Vec<GraphObject>> {
        Err(GraphPathError::Store(format!(
            "{} does not execute raw queries ({} chars given)",
            self.name(),
            query.len()
        )))
    }

    /// Get store name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_command_names() {
        for command in [MaintenanceCommand::RebuildIndex, MaintenanceCommand::ClearDatabase] {
            assert_eq!(MaintenanceCommand::from_segment(command.as_str()), Some(command));
        }
        assert_eq!(MaintenanceCommand::from_segment("maintenance"), None);
    }
}
