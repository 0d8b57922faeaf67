//! JSON graph fixtures
//!
//! A fixture lists nodes and relationships with their entity references, so
//! a seeded graph is addressable by stable paths:
//!
//! ```json
//! {
//!   "nodes": [{ "id": "…uuid…", "type": "Person", "properties": { "name": "Ada" } }],
//!   "relationships": [{ "type": "WORKS_AT", "source": "…", "target": "…" }]
//! }
//! ```

use crate::MemoryGraphStore;
use graphpath_core::{Entity, GraphPathError, PropertyMap, Relationship, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
    #[serde(default)]
    pub relationships: Vec<FixtureRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureNode {
    /// Entity reference; generated when absent
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRelationship {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub source: Uuid,
    pub target: Uuid,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Fixture {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| GraphPathError::Config(format!("Invalid fixture: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraphPathError::Config(format!("Failed to read fixture {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }
}

/// Insert every node, then every relationship, of `fixture` into `store`
pub async fn load_fixture(store: &MemoryGraphStore, fixture: Fixture) -> Result<()> {
    let (node_count, rel_count) = (fixture.nodes.len(), fixture.relationships.len());

    for node in fixture.nodes {
        let entity = Entity {
            node_id: 0,
            uuid: node.id.unwrap_or_else(Uuid::new_v4),
            entity_type: node.entity_type,
            properties: node.properties,
        };
        store.insert_node(entity).await?;
    }

    for rel in fixture.relationships {
        store
            .insert_relationship(Relationship {
                rel_id: 0,
                uuid: rel.id.unwrap_or_else(Uuid::new_v4),
                rel_type: rel.rel_type,
                source: rel.source,
                target: rel.target,
                properties: rel.properties,
            })
            .await?;
    }

    info!(
        nodes = node_count,
        relationships = rel_count,
        "Loaded graph fixture"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphpath_core::{GraphStore, Schema};
    use std::sync::Arc;

    const SCHEMA: &str = r#"
        [[type]]
        name = "Person"
        properties = { name = "string" }

        [[type]]
        name = "Company"
        properties = { name = "string" }

        [[relationship]]
        rel_type = "WORKS_AT"
        source = "Person"
        target = "Company"
    "#;

    const FIXTURE: &str = r#"{
        "nodes": [
            { "id": "6f1c2d8e-1111-4a55-9e0e-0c1f6d3a0001", "type": "Person", "properties": { "name": "Ada" } },
            { "id": "6f1c2d8e-1111-4a55-9e0e-0c1f6d3a0002", "type": "Company", "properties": { "name": "Acme" } }
        ],
        "relationships": [
            { "type": "WORKS_AT",
              "source": "6f1c2d8e-1111-4a55-9e0e-0c1f6d3a0001",
              "target": "6f1c2d8e-1111-4a55-9e0e-0c1f6d3a0002" }
        ]
    }"#;

    #[tokio::test]
    async fn test_fixture_keeps_references() {
        let store = MemoryGraphStore::new(Arc::new(Schema::from_toml_str(SCHEMA).unwrap()));
        load_fixture(&store, Fixture::from_json_str(FIXTURE).unwrap())
            .await
            .unwrap();

        let ada = Uuid::parse_str("6f1c2d8e-1111-4a55-9e0e-0c1f6d3a0001").unwrap();
        let found = store.find_by_uuid(ada).await.unwrap().unwrap();
        assert_eq!(found.properties["name"], "Ada");
        assert_eq!(store.relationship_count().await, 1);
    }

    #[tokio::test]
    async fn test_fixture_rejects_dangling_relationship() {
        let store = MemoryGraphStore::new(Arc::new(Schema::from_toml_str(SCHEMA).unwrap()));
        let mut fixture = Fixture::from_json_str(FIXTURE).unwrap();
        fixture.nodes.pop();

        let err = load_fixture(&store, fixture).await.unwrap_err();
        assert!(matches!(err, GraphPathError::NotFound(_)));
    }

    #[test]
    fn test_invalid_fixture_is_config_error() {
        assert!(matches!(
            Fixture::from_json_str("{ nodes: }"),
            Err(GraphPathError::Config(_))
        ));
    }
}
