//! In-memory graph store
//!
//! Nodes and relationships live in ordered maps keyed by their internal ids,
//! with reference indexes and an adjacency list on top. A single
//! `tokio::sync::RwLock` serialises writers; readers share the lock, so any
//! number of resolutions can search and traverse concurrently.

use crate::matcher::matches_group;
use async_trait::async_trait;
use graphpath_core::{
    traversal, Direction, Entity, GraphPath, GraphPathError, GraphStore, MaintenanceCommand,
    PathEvaluator, PropertyMap, Query, Relationship, Result, Schema, SortKey,
    TraversalDescription, ID_KEY, TYPE_KEY,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<u64, Entity>,
    node_index: HashMap<Uuid, u64>,
    relationships: BTreeMap<u64, Relationship>,
    relationship_index: HashMap<Uuid, u64>,
    /// Relationship ids touching each node
    adjacency: HashMap<Uuid, Vec<u64>>,
    next_node_id: u64,
    next_rel_id: u64,
}

impl GraphData {
    fn node(&self, uuid: Uuid) -> Option<&Entity> {
        self.node_index.get(&uuid).and_then(|id| self.nodes.get(id))
    }

    fn relationship(&self, uuid: Uuid) -> Option<&Relationship> {
        self.relationship_index
            .get(&uuid)
            .and_then(|id| self.relationships.get(id))
    }

    fn touching(&self, node: Uuid, direction: Direction, rel_type: Option<&str>) -> Vec<&Relationship> {
        let Some(ids) = self.adjacency.get(&node) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|id| self.relationships.get(id))
            .filter(|rel| rel_type.map_or(true, |t| rel.rel_type == t))
            .filter(|rel| match direction {
                Direction::Outgoing => rel.source == node,
                Direction::Incoming => rel.target == node,
                Direction::Both => true,
            })
            .collect()
    }

    fn insert_node(&mut self, mut entity: Entity) -> Entity {
        self.next_node_id += 1;
        entity.node_id = self.next_node_id;
        self.node_index.insert(entity.uuid, entity.node_id);
        self.nodes.insert(entity.node_id, entity.clone());
        entity
    }

    fn insert_relationship(&mut self, mut rel: Relationship) -> Relationship {
        self.next_rel_id += 1;
        rel.rel_id = self.next_rel_id;
        self.relationship_index.insert(rel.uuid, rel.rel_id);
        self.adjacency.entry(rel.source).or_default().push(rel.rel_id);
        if rel.target != rel.source {
            self.adjacency.entry(rel.target).or_default().push(rel.rel_id);
        }
        self.relationships.insert(rel.rel_id, rel.clone());
        rel
    }

    fn remove_relationship(&mut self, rel_id: u64) -> Option<Relationship> {
        let rel = self.relationships.remove(&rel_id)?;
        self.relationship_index.remove(&rel.uuid);
        for end in [rel.source, rel.target] {
            if let Some(ids) = self.adjacency.get_mut(&end) {
                ids.retain(|id| *id != rel_id);
            }
        }
        Some(rel)
    }

    fn remove_node(&mut self, uuid: Uuid) -> Option<(Entity, usize)> {
        let node_id = self.node_index.remove(&uuid)?;
        let entity = self.nodes.remove(&node_id)?;
        let attached = self.adjacency.remove(&uuid).unwrap_or_default();
        let mut removed = 0;
        for rel_id in attached {
            if self.remove_relationship(rel_id).is_some() {
                removed += 1;
            }
        }
        Some((entity, removed))
    }

    fn rebuild_indexes(&mut self) {
        self.node_index = self.nodes.values().map(|n| (n.uuid, n.node_id)).collect();
        self.relationship_index = self
            .relationships
            .values()
            .map(|r| (r.uuid, r.rel_id))
            .collect();

        self.adjacency.clear();
        for rel in self.relationships.values() {
            self.adjacency.entry(rel.source).or_default().push(rel.rel_id);
            if rel.target != rel.source {
                self.adjacency.entry(rel.target).or_default().push(rel.rel_id);
            }
        }
    }

    /// Value reached by a dotted sort path such as `employer.name`
    fn follow_path(&self, schema: &Schema, entity: &Entity, path: &[String]) -> Option<Value> {
        let (last, hops) = path.split_last()?;
        let mut current = entity;
        for hop in hops {
            let step = schema.relationship_by_property(&current.entity_type, hop)?;
            let rel = self
                .touching(current.uuid, step.direction, Some(step.rel_type))
                .into_iter()
                .next()?;
            current = self.node(rel.other_node(current.uuid))?;
        }
        current.value_of(last)
    }
}

/// Reference [`GraphStore`] keeping the whole graph in memory
pub struct MemoryGraphStore {
    schema: Arc<Schema>,
    data: RwLock<GraphData>,
}

impl MemoryGraphStore {
    /// Create an empty store validating writes against `schema`
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            data: RwLock::new(GraphData::default()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub async fn node_count(&self) -> usize {
        self.data.read().await.nodes.len()
    }

    pub async fn relationship_count(&self) -> usize {
        self.data.read().await.relationships.len()
    }

    /// Store a prepared entity, keeping its entity reference
    pub async fn insert_node(&self, entity: Entity) -> Result<Entity> {
        if self.schema.entity_type(&entity.entity_type).is_none() {
            return Err(GraphPathError::InvalidRequest(format!(
                "Unknown entity type {}",
                entity.entity_type
            )));
        }

        let mut properties = self.convert_properties(&entity.entity_type, entity.properties)?;
        properties.retain(|_, v| !v.is_null());
        let entity = Entity {
            properties,
            ..entity
        };

        let mut data = self.data.write().await;
        if data.node_index.contains_key(&entity.uuid) {
            return Err(GraphPathError::InvalidRequest(format!(
                "Entity {} already exists",
                entity.uuid
            )));
        }
        let stored = data.insert_node(entity);
        debug!(uuid = %stored.uuid, entity_type = %stored.entity_type, "Stored node");
        Ok(stored)
    }

    /// Store a prepared relationship, keeping its entity reference
    pub async fn insert_relationship(&self, rel: Relationship) -> Result<Relationship> {
        let mut data = self.data.write().await;
        if data.relationship_index.contains_key(&rel.uuid) {
            return Err(GraphPathError::InvalidRequest(format!(
                "Relationship {} already exists",
                rel.uuid
            )));
        }

        let source = data
            .node(rel.source)
            .ok_or_else(|| GraphPathError::not_found(format!("Node {}", rel.source)))?;
        let target = data
            .node(rel.target)
            .ok_or_else(|| GraphPathError::not_found(format!("Node {}", rel.target)))?;

        if let Some(declared) = self.schema.relationship_type(&rel.rel_type) {
            if !self.schema.is_assignable(&source.entity_type, &declared.source)
                || !self.schema.is_assignable(&target.entity_type, &declared.target)
            {
                return Err(GraphPathError::InvalidRequest(format!(
                    "{} cannot connect {} to {}",
                    rel.rel_type, source.entity_type, target.entity_type
                )));
            }
        }

        let mut rel = rel;
        rel.properties.retain(|_, v| !v.is_null());
        let stored = data.insert_relationship(rel);
        debug!(uuid = %stored.uuid, rel_type = %stored.rel_type, "Stored relationship");
        Ok(stored)
    }

    /// Run every property through the input converter of its declared type.
    ///
    /// Built-in keys are read-only and dropped; nulls are kept so updates
    /// can remove properties.
    fn convert_properties(&self, entity_type: &str, properties: PropertyMap) -> Result<PropertyMap> {
        let mut converted = PropertyMap::new();
        for (key, value) in properties {
            if key == ID_KEY || key == TYPE_KEY {
                debug!(key = %key, "Ignoring built-in property on write");
                continue;
            }
            let value_type = self.schema.input_converter(entity_type, &key).ok_or_else(|| {
                GraphPathError::InvalidRequest(format!(
                    "Unknown property {key} on type {entity_type}"
                ))
            })?;
            if value.is_null() {
                converted.insert(key, value);
                continue;
            }
            let value = value_type
                .convert(&value)
                .map_err(|e| GraphPathError::InvalidRequest(format!("{key}: {e}")))?;
            converted.insert(key, value);
        }
        Ok(converted)
    }

    fn type_matches(&self, query: &Query, entity: &Entity) -> bool {
        match &query.entity_type {
            None => true,
            Some(ty) if query.include_subtypes => self.schema.is_assignable(&entity.entity_type, ty),
            Some(ty) => &entity.entity_type == ty,
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Entity>> {
        Ok(self.data.read().await.node(uuid).cloned())
    }

    async fn find_by_node_id(&self, node_id: u64) -> Result<Option<Entity>> {
        Ok(self.data.read().await.nodes.get(&node_id).cloned())
    }

    async fn find_relationship(&self, uuid: Uuid) -> Result<Option<Relationship>> {
        Ok(self.data.read().await.relationship(uuid).cloned())
    }

    async fn find_relationship_by_id(&self, rel_id: u64) -> Result<Option<Relationship>> {
        Ok(self.data.read().await.relationships.get(&rel_id).cloned())
    }

    async fn search(&self, query: &Query) -> Result<Vec<Entity>> {
        let data = self.data.read().await;

        let mut hits: Vec<(&Entity, Vec<Option<Value>>)> = data
            .nodes
            .values()
            .filter(|entity| self.type_matches(query, entity))
            .filter(|entity| matches_group(query.filter(), &|key: &str| entity.value_of(key)))
            .map(|entity| {
                let keys = query
                    .sort
                    .iter()
                    .map(|order| match &order.key {
                        SortKey::Property(key) => entity.value_of(key),
                        SortKey::Path(path) => data.follow_path(&self.schema, entity, path),
                    })
                    .collect();
                (entity, keys)
            })
            .collect();

        if !query.sort.is_empty() {
            // Vec::sort_by is stable, so ties keep storage order
            hits.sort_by(|(_, a), (_, b)| {
                query
                    .sort
                    .iter()
                    .zip(a.iter().zip(b.iter()))
                    .map(|(order, (x, y))| order.compare(x.as_ref(), y.as_ref()))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let total = hits.len();
        let range = match query.page {
            Some(page) => page.bounds(total),
            None => 0..total,
        };

        debug!(
            entity_type = ?query.entity_type,
            total,
            returned = range.len(),
            "Search completed"
        );

        Ok(hits[range].iter().map(|(entity, _)| (*entity).clone()).collect())
    }

    async fn traverse(
        &self,
        start: Uuid,
        description: &TraversalDescription,
        evaluator: &dyn PathEvaluator,
    ) -> Result<Vec<GraphPath>> {
        let data = self.data.read().await;
        if data.node(start).is_none() {
            return Err(GraphPathError::not_found(format!("Node {start}")));
        }

        let outcome = traversal::expand(description, start, evaluator, |node, spec| {
            data.touching(node, spec.direction, Some(&spec.rel_type))
                .into_iter()
                .map(|rel| (rel.uuid, rel.other_node(node)))
                .collect()
        });

        if outcome.truncated {
            warn!(
                start = %start,
                limit = ?description.max_expanded,
                "Traversal stopped at the node limit"
            );
        }
        debug!(
            start = %start,
            expanded = outcome.expanded,
            paths = outcome.paths.len(),
            "Traversal completed"
        );

        Ok(outcome.paths)
    }

    async fn relationships(
        &self,
        node: Uuid,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        let data = self.data.read().await;
        if data.node(node).is_none() {
            return Err(GraphPathError::not_found(format!("Node {node}")));
        }
        Ok(data
            .touching(node, direction, rel_type)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn relationships_of_type(&self, rel_type: &str) -> Result<Vec<Relationship>> {
        Ok(self
            .data
            .read()
            .await
            .relationships
            .values()
            .filter(|rel| rel.rel_type == rel_type)
            .cloned()
            .collect())
    }

    async fn create_node(&self, entity_type: &str, properties: PropertyMap) -> Result<Entity> {
        let entity = Entity {
            properties,
            ..Entity::new(entity_type)
        };
        self.insert_node(entity).await
    }

    async fn update_node(&self, uuid: Uuid, properties: PropertyMap) -> Result<Entity> {
        let mut data = self.data.write().await;
        let node_id = *data
            .node_index
            .get(&uuid)
            .ok_or_else(|| GraphPathError::not_found(format!("Node {uuid}")))?;
        let entity = data
            .nodes
            .get_mut(&node_id)
            .ok_or_else(|| GraphPathError::not_found(format!("Node {uuid}")))?;
        let changes = self.convert_properties(&entity.entity_type, properties)?;

        for (key, value) in changes {
            if value.is_null() {
                entity.properties.remove(&key);
            } else {
                entity.properties.insert(key, value);
            }
        }
        Ok(entity.clone())
    }

    async fn delete_node(&self, uuid: Uuid) -> Result<()> {
        let (entity, removed) = self
            .data
            .write()
            .await
            .remove_node(uuid)
            .ok_or_else(|| GraphPathError::not_found(format!("Node {uuid}")))?;
        debug!(
            uuid = %uuid,
            entity_type = %entity.entity_type,
            relationships = removed,
            "Deleted node"
        );
        Ok(())
    }

    async fn create_relationship(
        &self,
        rel_type: &str,
        source: Uuid,
        target: Uuid,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        self.insert_relationship(Relationship {
            rel_id: 0,
            uuid: Uuid::new_v4(),
            rel_type: rel_type.to_string(),
            source,
            target,
            properties,
        })
        .await
    }

    async fn update_relationship(
        &self,
        uuid: Uuid,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        let mut data = self.data.write().await;
        let rel_id = *data
            .relationship_index
            .get(&uuid)
            .ok_or_else(|| GraphPathError::not_found(format!("Relationship {uuid}")))?;
        let rel = data
            .relationships
            .get_mut(&rel_id)
            .ok_or_else(|| GraphPathError::not_found(format!("Relationship {uuid}")))?;

        for (key, value) in properties {
            if key == ID_KEY || key == TYPE_KEY {
                continue;
            }
            if value.is_null() {
                rel.properties.remove(&key);
            } else {
                rel.properties.insert(key, value);
            }
        }
        Ok(rel.clone())
    }

    async fn delete_relationship(&self, uuid: Uuid) -> Result<()> {
        let mut data = self.data.write().await;
        let rel_id = *data
            .relationship_index
            .get(&uuid)
            .ok_or_else(|| GraphPathError::not_found(format!("Relationship {uuid}")))?;
        data.remove_relationship(rel_id);
        Ok(())
    }

    async fn run_maintenance(
        &self,
        command: MaintenanceCommand,
        params: &PropertyMap,
    ) -> Result<Value> {
        let mut data = self.data.write().await;

        let result = match command {
            MaintenanceCommand::RebuildIndex => {
                data.rebuild_indexes();
                json!({
                    "command": command.as_str(),
                    "nodes": data.nodes.len(),
                    "relationships": data.relationships.len(),
                })
            }
            MaintenanceCommand::ClearDatabase => {
                // An optional `type` parameter restricts clearing to one type and its subtypes
                let only = params.get(TYPE_KEY).and_then(Value::as_str);
                let doomed: Vec<Uuid> = data
                    .nodes
                    .values()
                    .filter(|n| only.map_or(true, |ty| self.schema.is_assignable(&n.entity_type, ty)))
                    .map(|n| n.uuid)
                    .collect();

                let mut deleted_relationships = 0;
                for uuid in &doomed {
                    if let Some((_, removed)) = data.remove_node(*uuid) {
                        deleted_relationships += removed;
                    }
                }
                json!({
                    "command": command.as_str(),
                    "deletedNodes": doomed.len(),
                    "deletedRelationships": deleted_relationships,
                })
            }
        };

        warn!(command = %command, result = %result, "Maintenance command executed");
        Ok(result)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
