//! Node-addressing resources: `Uuid`, `Id`, `Type`/`InheritingType`, `TypedId`

use crate::context::RequestContext;
use crate::resource::{ResourceKind, RestResource, Verb};
use crate::result::ResourceResult;
use async_trait::async_trait;
use graphpath_core::{Entity, GraphObject, GraphPathError, PropertyMap, Query, Result, Schema};
use graphpath_query::predicate_from_params;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Properties carried by a POST/PUT body
pub(crate) fn body_properties(body: &Value) -> Result<PropertyMap> {
    match body {
        Value::Null => Ok(PropertyMap::new()),
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        other => Err(GraphPathError::InvalidRequest(format!(
            "Expected a JSON object, got {other}"
        ))),
    }
}

/// How a segment names a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Uuid(Uuid),
    NodeId(u64),
}

impl Reference {
    pub async fn find(&self, ctx: &RequestContext) -> Result<Option<Entity>> {
        match self {
            Self::Uuid(uuid) => ctx.store.find_by_uuid(*uuid).await,
            Self::NodeId(id) => ctx.store.find_by_node_id(*id).await,
        }
    }

    pub async fn load(&self, ctx: &RequestContext) -> Result<Entity> {
        self.find(ctx)
            .await?
            .ok_or_else(|| GraphPathError::not_found(format!("Node {self}")))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::NodeId(id) => write!(f, "{id}"),
        }
    }
}

// ============================================================================
// Uuid
// ============================================================================

/// A bare entity reference; may name a node or a relationship
#[derive(Debug, Clone)]
pub struct UuidResource {
    pub uuid: Uuid,
    uri_part: String,
}

impl UuidResource {
    pub fn new(uuid: Uuid, segment: &str) -> Self {
        Self {
            uuid,
            uri_part: segment.to_string(),
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::Uuid(self.uuid)
    }

    pub async fn load_node(&self, ctx: &RequestContext) -> Result<Entity> {
        self.reference().load(ctx).await
    }
}

#[async_trait]
impl RestResource for UuidResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Uuid
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn supports(&self, verb: Verb) -> bool {
        matches!(verb, Verb::Get | Verb::Put | Verb::Delete)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        if let Some(node) = ctx.store.find_by_uuid(self.uuid).await? {
            return Ok(ResourceResult::single(node));
        }
        match ctx.store.find_relationship(self.uuid).await? {
            Some(rel) => Ok(ResourceResult::single(rel)),
            None => Err(GraphPathError::not_found(format!("Entity {}", self.uuid))),
        }
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let properties = body_properties(body)?;
        if ctx.store.find_by_uuid(self.uuid).await?.is_some() {
            let node = ctx.store.update_node(self.uuid, properties).await?;
            return Ok(ResourceResult::single(node));
        }
        let rel = ctx.store.update_relationship(self.uuid, properties).await?;
        Ok(ResourceResult::single(rel))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        if ctx.store.find_by_uuid(self.uuid).await?.is_some() {
            ctx.store.delete_node(self.uuid).await?;
        } else {
            ctx.store.delete_relationship(self.uuid).await?;
        }
        Ok(ResourceResult::empty())
    }
}

// ============================================================================
// Id
// ============================================================================

/// A node addressed by its internal numeric id
#[derive(Debug, Clone)]
pub struct IdResource {
    pub id: u64,
    uri_part: String,
}

impl IdResource {
    pub fn new(id: u64, segment: &str) -> Self {
        Self {
            id,
            uri_part: segment.to_string(),
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::NodeId(self.id)
    }

    pub async fn load(&self, ctx: &RequestContext) -> Result<Entity> {
        self.reference().load(ctx).await
    }
}

#[async_trait]
impl RestResource for IdResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Id
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn supports(&self, verb: Verb) -> bool {
        matches!(verb, Verb::Get | Verb::Put | Verb::Delete)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        Ok(ResourceResult::single(self.load(ctx).await?))
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let node = self.load(ctx).await?;
        let updated = ctx.store.update_node(node.uuid, body_properties(body)?).await?;
        Ok(ResourceResult::single(updated))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let node = self.load(ctx).await?;
        ctx.store.delete_node(node.uuid).await?;
        Ok(ResourceResult::empty())
    }
}

// ============================================================================
// Type / InheritingType
// ============================================================================

/// A collection of entities of one type
#[derive(Debug, Clone)]
pub struct TypeResource {
    pub name: String,
    /// Subtypes are included (the segment was the exact type name)
    pub inheriting: bool,
    uri_part: String,
}

impl TypeResource {
    pub fn new(name: impl Into<String>, inheriting: bool, segment: &str) -> Self {
        Self {
            name: name.into(),
            inheriting,
            uri_part: segment.to_string(),
        }
    }

    /// Whether an entity of `entity_type` belongs to this collection
    pub fn accepts(&self, schema: &Schema, entity_type: &str) -> bool {
        if self.inheriting {
            schema.is_assignable(entity_type, &self.name)
        } else {
            entity_type == self.name
        }
    }

    /// Search built from the request's query parameters
    pub fn query(&self, ctx: &RequestContext) -> Result<Query> {
        let criteria = predicate_from_params(&ctx.schema, &self.name, &ctx.params)?;
        let mut query = Query::for_type(self.name.as_str(), self.inheriting);
        criteria.configure_query(&ctx.schema, &self.name, None, &mut query, true)?;
        query.close_all();
        Ok(query)
    }

    pub async fn search(&self, ctx: &RequestContext) -> Result<Vec<Entity>> {
        let query = self.query(ctx)?;
        ctx.store.search(&query).await
    }
}

#[async_trait]
impl RestResource for TypeResource {
    fn kind(&self) -> ResourceKind {
        if self.inheriting {
            ResourceKind::InheritingType
        } else {
            ResourceKind::Type
        }
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn supports(&self, verb: Verb) -> bool {
        matches!(verb, Verb::Get | Verb::Post | Verb::Delete)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let entities = self.search(ctx).await?;
        Ok(ResourceResult::collection(
            entities.into_iter().map(GraphObject::from).collect(),
        ))
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let created = ctx
            .store
            .create_node(&self.name, body_properties(body)?)
            .await?;
        debug!(uuid = %created.uuid, entity_type = %self.name, "Created node");
        Ok(ResourceResult::created(created))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let doomed = self.search(ctx).await?;
        for entity in &doomed {
            ctx.store.delete_node(entity.uuid).await?;
        }
        debug!(entity_type = %self.name, deleted = doomed.len(), "Deleted matching nodes");
        Ok(ResourceResult::single(GraphObject::Value(
            json!({ "deleted": doomed.len() }),
        )))
    }
}

// ============================================================================
// TypedId
// ============================================================================

/// One entity of a known type
#[derive(Debug, Clone)]
pub struct TypedIdResource {
    pub entity_type: String,
    pub inheriting: bool,
    pub reference: Reference,
    uri_part: String,
}

impl TypedIdResource {
    pub fn new(ty: &TypeResource, reference: Reference, id_part: &str) -> Self {
        Self {
            entity_type: ty.name.clone(),
            inheriting: ty.inheriting,
            reference,
            uri_part: format!("{}/{id_part}", ty.uri_part),
        }
    }

    /// Load the entity, failing when it is missing or of another type
    pub async fn load(&self, ctx: &RequestContext) -> Result<Entity> {
        let entity = self.reference.load(ctx).await?;
        let accepted = if self.inheriting {
            ctx.schema.is_assignable(&entity.entity_type, &self.entity_type)
        } else {
            entity.entity_type == self.entity_type
        };
        if !accepted {
            return Err(GraphPathError::not_found(format!(
                "{} {} is not a {}",
                entity.entity_type, self.reference, self.entity_type
            )));
        }
        Ok(entity)
    }
}

#[async_trait]
impl RestResource for TypedIdResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::TypedId
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn supports(&self, verb: Verb) -> bool {
        matches!(verb, Verb::Get | Verb::Put | Verb::Delete)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        Ok(ResourceResult::single(self.load(ctx).await?))
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let entity = self.load(ctx).await?;
        let updated = ctx
            .store
            .update_node(entity.uuid, body_properties(body)?)
            .await?;
        Ok(ResourceResult::single(updated))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let entity = self.load(ctx).await?;
        ctx.store.delete_node(entity.uuid).await?;
        Ok(ResourceResult::empty())
    }
}
