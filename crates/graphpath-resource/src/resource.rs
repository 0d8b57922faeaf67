//! Resources
//!
//! A [`Resource`] is one recognised path segment or the fold of several.
//! The variants form a closed set; each wraps a struct implementing
//! [`RestResource`], which carries the verb semantics of that kind.

use crate::admin::{CypherResource, MaintenanceResource, SchemaResource};
use crate::context::RequestContext;
use crate::entity::{IdResource, TypeResource, TypedIdResource, UuidResource};
use crate::relationship::{
    NamedRelationResource, RelationshipFollowingResource, RelationshipNodeResource,
    RelationshipResource, StaticRelationshipResource,
};
use crate::result::{HeadResult, ResourceResult};
use crate::signature::resource_signature;
use crate::wrappers::{IdsOnlyResource, PagingResource, SortResource, ViewFilterResource};
use async_trait::async_trait;
use graphpath_core::{Entity, GraphPathError, Result};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Verbs and kinds
// ============================================================================

/// HTTP verb as seen by a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(method))
    }

    /// Verbs that change the graph
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag of every resource kind, used by the combination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Uuid,
    Id,
    Type,
    InheritingType,
    TypedId,
    Relationship,
    RelationshipNode,
    StaticRelationship,
    RelationshipFollowing,
    NamedRelation,
    Maintenance,
    Schema,
    Cypher,
    Paging,
    Sort,
    ViewFilter,
    IdsOnly,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uuid => "Uuid",
            Self::Id => "Id",
            Self::Type => "Type",
            Self::InheritingType => "InheritingType",
            Self::TypedId => "TypedId",
            Self::Relationship => "Relationship",
            Self::RelationshipNode => "RelationshipNode",
            Self::StaticRelationship => "StaticRelationship",
            Self::RelationshipFollowing => "RelationshipFollowing",
            Self::NamedRelation => "NamedRelation",
            Self::Maintenance => "Maintenance",
            Self::Schema => "Schema",
            Self::Cypher => "Cypher",
            Self::Paging => "Paging",
            Self::Sort => "Sort",
            Self::ViewFilter => "ViewFilter",
            Self::IdsOnly => "IdsOnly",
        }
    }

    /// Post-processors that only ever sit at the right end of a chain
    pub fn is_wrapper(&self) -> bool {
        matches!(self, Self::Paging | Self::Sort | Self::ViewFilter | Self::IdsOnly)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Verb semantics
// ============================================================================

/// Verb semantics of one resource kind.
///
/// Unsupported verbs fail with `IllegalMethod`.
#[async_trait]
pub trait RestResource: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Path text this resource was resolved from
    fn uri_part(&self) -> &str;

    /// Whether GET answers a list rather than a single item
    fn is_collection(&self) -> bool;

    /// Verbs other than HEAD/OPTIONS this resource answers
    fn supports(&self, verb: Verb) -> bool {
        verb == Verb::Get
    }

    fn illegal(&self, verb: Verb) -> GraphPathError {
        GraphPathError::illegal_method(verb.as_str(), self.kind().as_str())
    }

    async fn get(&self, _ctx: &RequestContext) -> Result<ResourceResult> {
        Err(self.illegal(Verb::Get))
    }

    async fn post(&self, _ctx: &RequestContext, _body: &Value) -> Result<ResourceResult> {
        Err(self.illegal(Verb::Post))
    }

    async fn put(&self, _ctx: &RequestContext, _body: &Value) -> Result<ResourceResult> {
        Err(self.illegal(Verb::Put))
    }

    async fn delete(&self, _ctx: &RequestContext) -> Result<ResourceResult> {
        Err(self.illegal(Verb::Delete))
    }
}

// ============================================================================
// Resource
// ============================================================================

/// A resolved path segment or a fold of several
#[derive(Debug, Clone)]
pub enum Resource {
    Uuid(UuidResource),
    Id(IdResource),
    Type(TypeResource),
    TypedId(TypedIdResource),
    Relationship(RelationshipResource),
    RelationshipNode(RelationshipNodeResource),
    StaticRelationship(StaticRelationshipResource),
    RelationshipFollowing(RelationshipFollowingResource),
    NamedRelation(NamedRelationResource),
    Maintenance(MaintenanceResource),
    Schema(SchemaResource),
    Cypher(CypherResource),
    Paging(PagingResource),
    Sort(SortResource),
    ViewFilter(ViewFilterResource),
    IdsOnly(IdsOnlyResource),
}

impl Resource {
    fn rest(&self) -> &dyn RestResource {
        match self {
            Self::Uuid(r) => r,
            Self::Id(r) => r,
            Self::Type(r) => r,
            Self::TypedId(r) => r,
            Self::Relationship(r) => r,
            Self::RelationshipNode(r) => r,
            Self::StaticRelationship(r) => r,
            Self::RelationshipFollowing(r) => r,
            Self::NamedRelation(r) => r,
            Self::Maintenance(r) => r,
            Self::Schema(r) => r,
            Self::Cypher(r) => r,
            Self::Paging(r) => r,
            Self::Sort(r) => r,
            Self::ViewFilter(r) => r,
            Self::IdsOnly(r) => r,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.rest().kind()
    }

    pub fn uri_part(&self) -> &str {
        self.rest().uri_part()
    }

    pub fn is_collection(&self) -> bool {
        self.rest().is_collection()
    }

    pub fn supports(&self, verb: Verb) -> bool {
        self.rest().supports(verb)
    }

    /// Access-control key of this resource
    pub fn signature(&self) -> String {
        resource_signature(self.uri_part())
    }

    /// Verbs answered by this resource, HEAD and OPTIONS included
    pub fn allowed_verbs(&self) -> Vec<Verb> {
        let rest = self.rest();
        Verb::ALL
            .into_iter()
            .filter(|verb| match verb {
                Verb::Head => rest.supports(Verb::Get),
                Verb::Options => true,
                other => rest.supports(*other),
            })
            .collect()
    }

    pub async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.rest().get(ctx).await
    }

    /// GET without items
    pub async fn head(&self, ctx: &RequestContext) -> Result<HeadResult> {
        self.rest().get(ctx).await.map(HeadResult::from)
    }

    pub async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.rest().post(ctx, body).await
    }

    pub async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.rest().put(ctx, body).await
    }

    pub async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.rest().delete(ctx).await
    }

    pub fn options(&self) -> Vec<Verb> {
        self.allowed_verbs()
    }

    /// The single node this resource stands for, when it can anchor a
    /// relationship segment
    pub async fn anchor_node(&self, ctx: &RequestContext) -> Result<Entity> {
        match self {
            Self::Uuid(r) => r.load_node(ctx).await,
            Self::Id(r) => r.load(ctx).await,
            Self::TypedId(r) => r.load(ctx).await,
            Self::RelationshipFollowing(r) => r.last_node(ctx).await,
            other => Err(GraphPathError::illegal_path(format!(
                "{} does not identify a single node",
                other.kind()
            ))),
        }
    }
}
