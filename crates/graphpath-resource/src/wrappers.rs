//! Post-processing wrappers
//!
//! Wrappers sit at the right end of a chain. They transform the GET result
//! of the wrapped resource and hand every other verb through unchanged.

use crate::context::RequestContext;
use crate::resource::{Resource, ResourceKind, RestResource, Verb};
use crate::result::{PageInfo, ResourceResult};
use async_trait::async_trait;
use graphpath_core::{
    Direction, GraphObject, PageRequest, Result, SortKey, SortOrder, ID_KEY, TYPE_KEY,
};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, warn};

// ============================================================================
// Paging
// ============================================================================

/// Slices a collection into one page
#[derive(Debug, Clone)]
pub struct PagingResource {
    inner: Box<Resource>,
    pub page: i64,
    pub page_size: usize,
}

impl PagingResource {
    pub fn new(inner: Resource, page: i64, page_size: usize) -> Self {
        Self {
            inner: Box::new(inner),
            page,
            page_size,
        }
    }
}

#[async_trait]
impl RestResource for PagingResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Paging
    }

    fn uri_part(&self) -> &str {
        self.inner.uri_part()
    }

    fn is_collection(&self) -> bool {
        self.inner.is_collection()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let mut result = self.inner.get(ctx).await?;
        if !result.is_collection {
            return Ok(result);
        }
        if self.page == 0 {
            warn!(uri = %self.uri_part(), "Page 0 requested, serving page 1");
        }

        let request = PageRequest::new(self.page, self.page_size);
        let total = result.items.len();
        let bounds = request.bounds(total);
        let page: Vec<GraphObject> = result.items.drain(bounds).collect();
        result.items = page;
        result.page = Some(PageInfo {
            page: request.effective_page(total),
            page_size: self.page_size,
            page_count: request.page_count(total),
            raw_result_count: total,
        });
        Ok(result)
    }

    fn supports(&self, verb: Verb) -> bool {
        self.inner.supports(verb)
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.post(ctx, body).await
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.put(ctx, body).await
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.inner.delete(ctx).await
    }
}

// ============================================================================
// Sort
// ============================================================================

/// Stable multi-key sort of a collection
#[derive(Debug, Clone)]
pub struct SortResource {
    inner: Box<Resource>,
    pub keys: Vec<SortOrder>,
}

impl SortResource {
    pub fn new(inner: Resource, keys: Vec<SortOrder>) -> Self {
        Self {
            inner: Box::new(inner),
            keys,
        }
    }

    /// Value of one sort key for an item; `Path` keys follow relationship
    /// properties through the store
    async fn sort_value(
        &self,
        ctx: &RequestContext,
        item: &GraphObject,
        key: &SortKey,
    ) -> Result<Option<Value>> {
        let path = match key {
            SortKey::Property(name) => return Ok(item.value_of(name)),
            SortKey::Path(path) => path,
        };
        let GraphObject::Node(start) = item else {
            return Ok(None);
        };
        let Some((property, hops)) = path.split_last() else {
            return Ok(None);
        };

        let mut current = start.clone();
        for hop in hops {
            let Some(declared) = ctx.schema.relationship_by_property(&current.entity_type, hop)
            else {
                return Ok(None);
            };
            let direction: Direction = declared.direction;
            let next = ctx
                .store
                .relationships(current.uuid, direction, Some(declared.rel_type))
                .await?
                .into_iter()
                .next()
                .map(|rel| rel.other_node(current.uuid));
            let Some(next) = next else {
                return Ok(None);
            };
            match ctx.store.find_by_uuid(next).await? {
                Some(node) => current = node,
                None => return Ok(None),
            }
        }
        Ok(current.value_of(property))
    }
}

#[async_trait]
impl RestResource for SortResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Sort
    }

    fn uri_part(&self) -> &str {
        self.inner.uri_part()
    }

    fn is_collection(&self) -> bool {
        self.inner.is_collection()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let mut result = self.inner.get(ctx).await?;
        if !result.is_collection || self.keys.is_empty() {
            return Ok(result);
        }

        let mut keyed = Vec::with_capacity(result.items.len());
        for item in result.items.drain(..) {
            let mut values = Vec::with_capacity(self.keys.len());
            for order in &self.keys {
                values.push(self.sort_value(ctx, &item, &order.key).await?);
            }
            keyed.push((values, item));
        }

        // `sort_by` is stable, so ties keep the wrapped order
        keyed.sort_by(|(a, _), (b, _)| {
            self.keys
                .iter()
                .zip(a.iter().zip(b.iter()))
                .map(|(order, (x, y))| order.compare(x.as_ref(), y.as_ref()))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        debug!(keys = self.keys.len(), items = keyed.len(), "Sorted collection");

        result.items = keyed.into_iter().map(|(_, item)| item).collect();
        Ok(result)
    }

    fn supports(&self, verb: Verb) -> bool {
        self.inner.supports(verb)
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.post(ctx, body).await
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.put(ctx, body).await
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.inner.delete(ctx).await
    }
}

// ============================================================================
// ViewFilter
// ============================================================================

/// Projects nodes to the properties of a named view
#[derive(Debug, Clone)]
pub struct ViewFilterResource {
    inner: Box<Resource>,
    pub view: String,
    uri_part: String,
}

impl ViewFilterResource {
    pub fn new(inner: Resource, view: impl Into<String>, segment: &str) -> Self {
        let uri_part = format!("{}/{segment}", inner.uri_part());
        Self {
            inner: Box::new(inner),
            view: view.into(),
            uri_part,
        }
    }
}

#[async_trait]
impl RestResource for ViewFilterResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ViewFilter
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        self.inner.is_collection()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let mut result = self.inner.get(ctx).await?;
        for item in &mut result.items {
            let GraphObject::Node(entity) = item else {
                continue;
            };
            // Types without this view are passed through untouched
            if let Some(keep) = ctx.schema.view(&entity.entity_type, &self.view) {
                entity.properties.retain(|key, _| {
                    key == ID_KEY || key == TYPE_KEY || keep.iter().any(|k| k == key)
                });
            }
        }
        result.view = Some(self.view.clone());
        Ok(result)
    }

    fn supports(&self, verb: Verb) -> bool {
        self.inner.supports(verb)
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.post(ctx, body).await
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.put(ctx, body).await
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.inner.delete(ctx).await
    }
}

// ============================================================================
// IdsOnly
// ============================================================================

/// Replaces every item by its entity reference
#[derive(Debug, Clone)]
pub struct IdsOnlyResource {
    inner: Box<Resource>,
    uri_part: String,
}

impl IdsOnlyResource {
    pub fn new(inner: Resource, segment: &str) -> Self {
        let uri_part = format!("{}/{segment}", inner.uri_part());
        Self {
            inner: Box::new(inner),
            uri_part,
        }
    }
}

#[async_trait]
impl RestResource for IdsOnlyResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::IdsOnly
    }

    fn uri_part(&self) -> &str {
        &self.uri_part
    }

    fn is_collection(&self) -> bool {
        self.inner.is_collection()
    }

    async fn get(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        let mut result = self.inner.get(ctx).await?;
        result.items = result
            .items
            .into_iter()
            .map(|item| match item.uuid() {
                Some(uuid) => GraphObject::Value(Value::String(uuid.to_string())),
                None => item,
            })
            .collect();
        Ok(result)
    }

    fn supports(&self, verb: Verb) -> bool {
        self.inner.supports(verb)
    }

    async fn post(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.post(ctx, body).await
    }

    async fn put(&self, ctx: &RequestContext, body: &Value) -> Result<ResourceResult> {
        self.inner.put(ctx, body).await
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResult> {
        self.inner.delete(ctx).await
    }
}
