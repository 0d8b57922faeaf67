//! graphpath Core - Domain models, traits, and shared types
//!
//! This crate defines the abstractions shared by the resolution and
//! predicate engines:
//! - Graph objects (entities, relationships)
//! - The error taxonomy surfaced to the HTTP boundary
//! - Schema (entity types, declared relationships, views, converters)
//! - The lowered query representation consumed by search backends
//! - Traversal descriptions and the store trait
//! - Configuration management

pub mod config;
pub mod query;
pub mod schema;
pub mod store;
pub mod traversal;

pub use config::{
    AccessRule, AppConfig, AuthConfig, ConfigError, EngineConfig, LoggingConfig, ServerConfig,
    StorageConfig,
};
pub use query::{
    compare_for_sort, compare_values, Bracket, Matcher, Operation, PageRequest, Query,
    QueryGroup, QueryNode, SearchAttribute, SortKey, SortOrder,
};
pub use schema::{
    ConversionError, DeclaredRelationship, EntityType, RelationshipMatch, Schema, TypeMatch,
    ValueType,
};
pub use store::{GraphStore, MaintenanceCommand};
pub use traversal::{
    Direction, Evaluation, GraphPath, PathEvaluator, RelationshipSpec, TraversalDescription,
    TraversalOrder, TraversalOutcome, Uniqueness,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while resolving paths and lowering predicates.
///
/// Every variant propagates unmodified to the HTTP boundary; nothing is
/// retried inside the engines.
#[derive(Error, Debug)]
pub enum GraphPathError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal path: {0}")]
    IllegalPath(String),

    #[error("Method {method} not allowed on {resource}")]
    IllegalMethod { method: String, resource: String },

    #[error("Not allowed: {reason}")]
    NotAllowed { reason: String },

    #[error("Invalid search field {key} for type {entity_type}")]
    InvalidSearchField { entity_type: String, key: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraphPathError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn illegal_path(reason: impl Into<String>) -> Self {
        Self::IllegalPath(reason.into())
    }

    pub fn illegal_method(method: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::IllegalMethod {
            method: method.into(),
            resource: resource.into(),
        }
    }

    pub fn invalid_search_field(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::InvalidSearchField {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphPathError>;

// ============================================================================
// Graph Objects
// ============================================================================

/// Property values keyed by property name
pub type PropertyMap = BTreeMap<String, Value>;

/// Built-in key holding the entity reference of a node or relationship
pub const ID_KEY: &str = "id";

/// Built-in key holding the entity type (or relationship type)
pub const TYPE_KEY: &str = "type";

/// A node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Internal numeric node id assigned by the store
    pub node_id: u64,

    /// Globally unique entity reference
    pub uuid: Uuid,

    /// Declared entity type
    pub entity_type: String,

    /// Property values
    pub properties: PropertyMap,
}

impl Entity {
    /// Create a new, not yet stored entity
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            node_id: 0,
            uuid: Uuid::new_v4(),
            entity_type: entity_type.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Add a property value
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property, including the built-in `id` and `type` keys
    pub fn value_of(&self, key: &str) -> Option<Value> {
        match key {
            ID_KEY => Some(Value::String(self.uuid.to_string())),
            TYPE_KEY => Some(Value::String(self.entity_type.clone())),
            _ => self.properties.get(key).cloned(),
        }
    }
}

/// A directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Internal numeric relationship id assigned by the store
    pub rel_id: u64,

    /// Globally unique relationship reference
    pub uuid: Uuid,

    /// Relationship type (e.g. "WORKS_AT")
    pub rel_type: String,

    /// Start node
    pub source: Uuid,

    /// End node
    pub target: Uuid,

    /// Property values
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn value_of(&self, key: &str) -> Option<Value> {
        match key {
            ID_KEY => Some(Value::String(self.uuid.to_string())),
            TYPE_KEY => Some(Value::String(self.rel_type.clone())),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// The node on the far side of this relationship, seen from `node`
    pub fn other_node(&self, node: Uuid) -> Uuid {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// One element of a resource result
#[derive(Debug, Clone, PartialEq)]
pub enum GraphObject {
    Node(Entity),
    Relationship(Relationship),
    /// Structural values (schema descriptions, identifier lists, raw query rows)
    Value(Value),
}

impl GraphObject {
    /// Entity reference of the object, if it has one
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Self::Node(entity) => Some(entity.uuid),
            Self::Relationship(rel) => Some(rel.uuid),
            Self::Value(_) => None,
        }
    }

    /// Property lookup used by sorting and projections
    pub fn value_of(&self, key: &str) -> Option<Value> {
        match self {
            Self::Node(entity) => entity.value_of(key),
            Self::Relationship(rel) => rel.value_of(key),
            Self::Value(value) => value.get(key).cloned(),
        }
    }

    /// Render as a flat JSON object (`id`, `type`, then properties)
    pub fn to_json(&self) -> Value {
        match self {
            Self::Node(entity) => {
                let mut map = serde_json::Map::new();
                map.insert(ID_KEY.to_string(), Value::String(entity.uuid.to_string()));
                map.insert(TYPE_KEY.to_string(), Value::String(entity.entity_type.clone()));
                for (key, value) in &entity.properties {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Self::Relationship(rel) => {
                let mut map = serde_json::Map::new();
                map.insert(ID_KEY.to_string(), Value::String(rel.uuid.to_string()));
                map.insert(TYPE_KEY.to_string(), Value::String(rel.rel_type.clone()));
                map.insert("source".to_string(), Value::String(rel.source.to_string()));
                map.insert("target".to_string(), Value::String(rel.target.to_string()));
                for (key, value) in &rel.properties {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Self::Value(value) => value.clone(),
        }
    }
}

impl From<Entity> for GraphObject {
    fn from(entity: Entity) -> Self {
        Self::Node(entity)
    }
}

impl From<Relationship> for GraphObject {
    fn from(rel: Relationship) -> Self {
        Self::Relationship(rel)
    }
}

// ============================================================================
// Identifier helpers
// ============================================================================

/// Parse a path segment as an entity reference.
///
/// Both the hyphenated and the 32-hex simple form are accepted.
pub fn parse_entity_reference(segment: &str) -> Option<Uuid> {
    match segment.len() {
        32 | 36 => Uuid::try_parse(segment).ok(),
        _ => None,
    }
}

/// True for all-digit segments addressing a node by its internal id
pub fn is_numeric_id(segment: &str) -> bool {
    !segment.is_empty() && segment.len() <= 19 && segment.bytes().all(|b| b.is_ascii_digit())
}

/// True for segments that carry a concrete identifier
pub fn is_identifier_segment(segment: &str) -> bool {
    parse_entity_reference(segment).is_some() || is_numeric_id(segment)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("Person")
            .with_property("name", "Alice")
            .with_property("age", 42);

        assert_eq!(entity.entity_type, "Person");
        assert_eq!(entity.value_of("name"), Some(json!("Alice")));
        assert_eq!(entity.value_of("type"), Some(json!("Person")));
        assert_eq!(
            entity.value_of("id"),
            Some(Value::String(entity.uuid.to_string()))
        );
        assert_eq!(entity.value_of("missing"), None);
    }

    #[test]
    fn test_graph_object_json() {
        let entity = Entity::new("Person").with_property("name", "Bob");
        let json = GraphObject::Node(entity.clone()).to_json();

        assert_eq!(json["type"], "Person");
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["id"], entity.uuid.to_string());
    }

    #[test]
    fn test_relationship_other_node() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rel = Relationship {
            rel_id: 1,
            uuid: Uuid::new_v4(),
            rel_type: "KNOWS".to_string(),
            source: a,
            target: b,
            properties: PropertyMap::new(),
        };
        assert_eq!(rel.other_node(a), b);
        assert_eq!(rel.other_node(b), a);
    }

    #[test]
    fn test_identifier_segments() {
        let uuid = Uuid::new_v4();
        assert_eq!(parse_entity_reference(&uuid.to_string()), Some(uuid));
        assert_eq!(
            parse_entity_reference(&uuid.simple().to_string()),
            Some(uuid)
        );
        assert!(parse_entity_reference("persons").is_none());
        assert!(is_numeric_id("42"));
        assert!(!is_numeric_id("4a"));
        assert!(!is_numeric_id(""));
        assert!(is_identifier_segment("17"));
        assert!(!is_identifier_segment("in"));
    }

    #[test]
    fn test_error_display() {
        let err = GraphPathError::illegal_method("POST", "TypedId");
        assert_eq!(err.to_string(), "Method POST not allowed on TypedId");

        let err = GraphPathError::invalid_search_field("Person", "shoeSize");
        assert!(err.to_string().contains("shoeSize"));
    }
}
