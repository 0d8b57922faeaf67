//! Relationship resources
//!
//! - `Relationship(dir)`: the relationships of one node (`…/<id>/out`)
//! - `RelationshipNode`: the start or end nodes of wrapped relationships
//! - `StaticRelationship`: entities reached over a declared relationship
//!   (`Person/<id>/Company`)
//! - `RelationshipFollowing`: a validated chain of typed ids
//! - `NamedRelation`: relationships addressed by their type name

use crate::context::RequestContext;
use crate::entity::{body_properties, Reference, TypeResource, TypedIdResource};
use crate::resource::{Resource, ResourceKind, RestResource, Verb};
use crate::result::ResourceResult;
use crate::validator::RelationshipPathValidator;
use async_trait::async_trait;
use graphpath_core::{
    Direction, Entity, GraphObject, GraphPathError, PropertyMap, Relationship, Result,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// Relationship(dir)
// ============================================================================

/// Relationships of the wrapped node in one direction
#[derive(Debug, Clone)]
pub struct RelationshipResource {
    pub direction: Direction,
    inner: Box<Resource>,
    uri_part: String,
}

impl RelationshipResource {
    pub fn new(direction: Direction, inner: Resource, segment: &str) -> Self {
        let uri_part = format!("{}/{segment}", inner.uri_part());
        Self {
            direction,
            inner: Box::new(inner),
            uri_part,
        }
    }
}

#[async_trait]
impl RestResource for RelationshipResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Relationship
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        true
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let node = self.inner.anchor_node(ctx).await?;
        let relationships = ctx
            .store
            .relationships(node.uuid, self.direction, None)
            .await?;
        Ok(ResourceResult::collection(
            relationships.into_iter().map(GraphObject::from).collect(),
        ))
    }
}

// ============================================================================
// RelationshipNode
// ============================================================================

/// Which end of a relationship to select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEnd {
    Start,
    End,
}

impl NodeEnd {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    fn of(&self, rel: &Relationship) -> Uuid {
        match self {
            Self::Start => rel.source,
            Self::End => rel.target,
        }
    }
}

/// Start or end nodes of the relationships answered by the wrapped resource
#[derive(Debug, Clone)]
pub struct RelationshipNodeResource {
    pub end: NodeEnd,
    inner: Box<Resource>,
    uri_part: String,
}

impl RelationshipNodeResource {
    pub fn new(end: NodeEnd, inner: Resource, segment: &str) -> Self {
        let uri_part = format!("{}/{segment}", inner.uri_part());
        Self {
            end,
            inner: Box::new(inner),
            uri_part,
        }
    }
}

#[async_trait]
impl RestResource for RelationshipNodeResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RelationshipNode
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        self.inner.is_collection()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let relationships = self.inner.get(ctx).await?;

        let mut nodes = Vec::with_capacity(relationships.len());
        for item in &relationships.items {
            let GraphObject::Relationship(rel) = item else {
                continue;
            };
            let uuid = self.end.of(rel);
            let node = ctx
                .store
                .find_by_uuid(uuid)
                .await?
                .ok_or_else(|| GraphPathError::not_found(format!("Node {uuid}")))?;
            nodes.push(GraphObject::from(node));
        }

        if self.is_collection() {
            Ok(ResourceResult::collection(nodes))
        } else {
            nodes
                .into_iter()
                .next()
                .map(ResourceResult::single)
                .ok_or_else(|| GraphPathError::not_found(self.uri_part.clone()))
        }
    }
}

// ============================================================================
// StaticRelationship
// ============================================================================

/// Entities of `target` type related to the anchor over a declared relationship
#[derive(Debug, Clone)]
pub struct StaticRelationshipResource {
    anchor: Box<Resource>,
    pub target: TypeResource,
    pub rel_type: String,
    /// Direction as seen from the anchor
    pub direction: Direction,
    uri_part: String,
}

impl StaticRelationshipResource {
    pub fn new(anchor: Resource, target: TypeResource, rel_type: &str, direction: Direction) -> Self {
        let uri_part = format!("{}/{}", anchor.uri_part(), target.uri_part());
        Self {
            anchor: Box::new(anchor),
            target,
            rel_type: rel_type.to_string(),
            direction,
            uri_part,
        }
    }

    /// Split back into the anchor and the target type
    pub fn into_parts(self) -> (Resource, TypeResource) {
        (*self.anchor, self.target)
    }

    async fn related(&self, ctx: &RequestContext, anchor: &Entity) -> Result<Vec<Entity>> {
        let relationships = ctx
            .store
            .relationships(anchor.uuid, self.direction, Some(&self.rel_type))
            .await?;

        let mut related = Vec::with_capacity(relationships.len());
        for rel in relationships {
            let other = rel.other_node(anchor.uuid);
            if let Some(node) = ctx.store.find_by_uuid(other).await? {
                if self.target.accepts(&ctx.schema, &node.entity_type) {
                    related.push(node);
                }
            }
        }
        Ok(related)
    }
}

#[async_trait]
impl RestResource for StaticRelationshipResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StaticRelationship
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn supports(&self, verb: Verb) -> bool {
        matches!(verb, Verb::Get | Verb::Post)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let anchor = self.anchor.anchor_node(ctx).await?;
        let related = self.related(ctx, &anchor).await?;
        Ok(ResourceResult::collection(
            related.into_iter().map(GraphObject::from).collect(),
        ))
    }

    /// Create an entity of the target type and connect it to the anchor
    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let anchor = self.anchor.anchor_node(ctx).await?;
        let created = ctx
            .store
            .create_node(&self.target.name, body_properties(body)?)
            .await?;

        let (source, target) = match self.direction {
            Direction::Incoming => (created.uuid, anchor.uuid),
            Direction::Outgoing | Direction::Both => (anchor.uuid, created.uuid),
        };
        ctx.store
            .create_relationship(&self.rel_type, source, target, PropertyMap::new())
            .await?;

        debug!(
            anchor = %anchor.uuid,
            created = %created.uuid,
            rel_type = %self.rel_type,
            "Created related node"
        );
        Ok(ResourceResult::created(created))
    }
}

// ============================================================================
// RelationshipFollowing
// ============================================================================

/// A chain of typed ids proven connected before any verb runs
#[derive(Debug, Clone)]
pub struct RelationshipFollowingResource {
    validator: RelationshipPathValidator,
    uri_part: String,
}

impl RelationshipFollowingResource {
    pub fn new(validator: RelationshipPathValidator, uri_part: String) -> Self {
        Self {
            validator,
            uri_part,
        }
    }

    pub fn validator(&self) -> &RelationshipPathValidator {
        &self.validator
    }

    /// Extend the chain by one typed id
    pub fn push(&mut self, schema: &graphpath_core::Schema, next: TypedIdResource) -> Result<()> {
        let part = next.uri_part().to_string();
        self.validator.push(schema, next)?;
        self.uri_part = format!("{}/{part}", self.uri_part);
        Ok(())
    }

    fn last(&self) -> Result<&TypedIdResource> {
        self.validator
            .last()
            .ok_or_else(|| GraphPathError::illegal_path("Empty relationship path"))
    }

    /// Validate the chain and return its last node
    pub async fn last_node(&self, ctx: &RequestContext) -> Result<Entity> {
        let validated = self.validator.validate(ctx).await?;
        validated
            .nodes
            .into_iter()
            .last()
            .ok_or_else(|| GraphPathError::not_found(self.uri_part.clone()))
    }
}

#[async_trait]
impl RestResource for RelationshipFollowingResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RelationshipFollowing
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn supports(&self, verb: Verb) -> bool {
        self.last().map(|last| last.supports(verb)).unwrap_or(false)
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.validator.validate(ctx).await?;
        self.last()?.get(ctx).await
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.validator.validate(ctx).await?;
        self.last()?.post(ctx, body).await
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.validator.validate(ctx).await?;
        self.last()?.put(ctx, body).await
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.validator.validate(ctx).await?;
        self.last()?.delete(ctx).await
    }
}

// ============================================================================
// NamedRelation
// ============================================================================

/// Relationships of one declared type, or one of them when bound to an id
#[derive(Debug, Clone)]
pub struct NamedRelationResource {
    pub rel_type: String,
    pub bound: Option<Reference>,
    uri_part: String,
}

impl NamedRelationResource {
    pub fn new(rel_type: impl Into<String>, segment: &str) -> Self {
        Self {
            rel_type: rel_type.into(),
            bound: None,
            uri_part: segment.to_string(),
        }
    }

    /// Bind to a single relationship
    pub fn bind(self, reference: Reference, segment: &str) -> Self {
        Self {
            bound: Some(reference),
            uri_part: format!("{}/{segment}", self.uri_part),
            ..self
        }
    }

    async fn load_bound(&self, ctx: &RequestContext, reference: Reference) -> Result<Relationship> {
        let found = match reference {
            Reference::Uuid(uuid) => ctx.store.find_relationship(uuid).await?,
            Reference::NodeId(id) => ctx.store.find_relationship_by_id(id).await?,
        };
        found
            .filter(|rel| rel.rel_type == self.rel_type)
            .ok_or_else(|| GraphPathError::not_found(format!("{} {reference}", self.rel_type)))
    }

    fn bound_reference(&self, verb: Verb) -> Result<Reference> {
        self.bound.ok_or_else(|| self.illegal(verb))
    }
}

fn endpoint(body: &Value, key: &str) -> Result<Uuid> {
    body.get(key)
        .and_then(Value::as_str)
        .and_then(graphpath_core::parse_entity_reference)
        .ok_or_else(|| {
            GraphPathError::InvalidRequest(format!("Missing or invalid relationship {key}"))
        })
}

#[async_trait]
impl RestResource for NamedRelationResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::NamedRelation
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        self.bound.is_none()
    }

    fn supports(&self, verb: Verb) -> bool {
        match self.bound {
            None => matches!(verb, Verb::Get | Verb::Post),
            Some(_) => matches!(verb, Verb::Get | Verb::Put | Verb::Delete),
        }
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        match self.bound {
            Some(reference) => Ok(ResourceResult::single(
                self.load_bound(ctx, reference).await?,
            )),
            None => {
                let relationships = ctx.store.relationships_of_type(&self.rel_type).await?;
                Ok(ResourceResult::collection(
                    relationships.into_iter().map(GraphObject::from).collect(),
                ))
            }
        }
    }

    /// Create `{source, target, ...properties}`
    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        if self.bound.is_some() {
            return Err(self.illegal(Verb::Post));
        }
        let source = endpoint(body, "source")?;
        let target = endpoint(body, "target")?;
        let mut properties = body_properties(body)?;
        properties.remove("source");
        properties.remove("target");

        let created = ctx
            .store
            .create_relationship(&self.rel_type, source, target, properties)
            .await?;
        Ok(ResourceResult::created(created))
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        let rel = self.load_bound(ctx, self.bound_reference(Verb::Put)?).await?;
        let updated = ctx
            .store
            .update_relationship(rel.uuid, body_properties(body)?)
            .await?;
        Ok(ResourceResult::single(updated))
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let rel = self.load_bound(ctx, self.bound_reference(Verb::Delete)?).await?;
        ctx.store.delete_relationship(rel.uuid).await?;
        Ok(ResourceResult::empty())
    }
}
