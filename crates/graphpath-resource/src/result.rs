//! Result shapes returned by terminal resources

use graphpath_core::GraphObject;
use serde::Serialize;
use serde_json::{json, Value};

/// Pagination metadata attached by the paging wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    /// Number of items before slicing
    pub raw_result_count: usize,
}

/// Outcome of GET/POST/PUT/DELETE on a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceResult {
    pub items: Vec<GraphObject>,
    pub is_collection: bool,
    pub page: Option<PageInfo>,
    /// View the items were projected to
    pub view: Option<String>,
    /// A new node or relationship was stored
    pub created: bool,
}

impl ResourceResult {
    pub fn single(item: impl Into<GraphObject>) -> Self {
        Self {
            items: vec![item.into()],
            ..Self::default()
        }
    }

    pub fn collection(items: Vec<GraphObject>) -> Self {
        Self {
            items,
            is_collection: true,
            ..Self::default()
        }
    }

    pub fn created(item: impl Into<GraphObject>) -> Self {
        Self {
            created: true,
            ..Self::single(item)
        }
    }

    /// A result without content, e.g. after a delete
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// JSON body: `result` holds the list (collections) or the single item
    pub fn to_json(&self) -> Value {
        let result = if self.is_collection {
            Value::Array(self.items.iter().map(GraphObject::to_json).collect())
        } else {
            self.items.first().map(GraphObject::to_json).unwrap_or(Value::Null)
        };

        let mut body = json!({
            "result": result,
            "resultCount": self.items.len(),
        });
        if let (Some(page), Value::Object(map)) = (&self.page, &mut body) {
            map.insert("page".into(), json!(page.page));
            map.insert("pageSize".into(), json!(page.page_size));
            map.insert("pageCount".into(), json!(page.page_count));
            map.insert("rawResultCount".into(), json!(page.raw_result_count));
        }
        if let (Some(view), Value::Object(map)) = (&self.view, &mut body) {
            map.insert("view".into(), json!(view));
        }
        body
    }
}

/// HEAD answer: counts without items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadResult {
    pub result_count: usize,
    pub is_collection: bool,
    pub page: Option<PageInfo>,
}

impl From<ResourceResult> for HeadResult {
    fn from(result: ResourceResult) -> Self {
        Self {
            result_count: result.items.len(),
            is_collection: result.is_collection,
            page: result.page,
        }
    }
}
