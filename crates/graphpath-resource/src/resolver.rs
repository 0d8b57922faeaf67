//! Resource chain resolution
//!
//! A request path is split into segments, each segment is recognised, and
//! the resources are folded left to right through the combination table.
//! Sort and paging clauses from the query string are appended last.

use crate::combine::{combine, with_paging, with_sort};
use crate::context::RequestContext;
use crate::recognize::recognize;
use crate::resource::{Resource, Verb};
use crate::result::{HeadResult, ResourceResult};
use graphpath_core::{GraphPathError, Result, SortKey, SortOrder};
use graphpath_query::params::{ORDER_PARAM, PAGE_PARAM, PAGE_SIZE_PARAM, SORT_PARAM};
use serde_json::Value;
use tracing::debug;

/// Resolve a slash-separated path against the request context
pub fn resolve(path: &str, ctx: &RequestContext) -> Result<Resource> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    resolve_segments(&segments, ctx)
}

/// Resolve already split segments
pub fn resolve_segments(segments: &[&str], ctx: &RequestContext) -> Result<Resource> {
    let (first, rest) = segments
        .split_first()
        .ok_or_else(|| GraphPathError::not_found("Empty resource path"))?;

    let mut resource = recognize(&ctx.schema, first)?.into_resource()?;
    for segment in rest {
        let next = recognize(&ctx.schema, segment)?;
        debug!(left = %resource.kind(), right = %next.kind(), segment, "Combining segment");
        resource = combine(&ctx.schema, resource, next)?;
    }

    if let Some(keys) = sort_keys(ctx)? {
        resource = with_sort(resource, keys)?;
    }
    if let Some((page, page_size)) = paging(ctx)? {
        resource = with_paging(resource, page, page_size)?;
    }

    debug!(
        kind = %resource.kind(),
        uri = %resource.uri_part(),
        signature = %resource.signature(),
        "Resolved resource"
    );
    Ok(resource)
}

/// Sort clauses from `sort=a,b.c` and `order=asc|desc`
fn sort_keys(ctx: &RequestContext) -> Result<Option<Vec<SortOrder>>> {
    let descending = match ctx.param(ORDER_PARAM) {
        None => false,
        Some(order) if order.eq_ignore_ascii_case("asc") => false,
        Some(order) if order.eq_ignore_ascii_case("desc") => true,
        Some(other) => {
            return Err(GraphPathError::InvalidRequest(format!(
                "Invalid {ORDER_PARAM} '{other}', expected asc or desc"
            )))
        }
    };

    let Some(sort) = ctx.param(SORT_PARAM) else {
        if ctx.param(ORDER_PARAM).is_some() {
            debug!("Ignoring {ORDER_PARAM} without {SORT_PARAM}");
        }
        return Ok(None);
    };

    let keys: Vec<SortOrder> = sort
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            let key = if key.contains('.') {
                SortKey::Path(key.split('.').map(str::to_string).collect())
            } else {
                SortKey::Property(key.to_string())
            };
            SortOrder { key, descending }
        })
        .collect();

    Ok((!keys.is_empty()).then_some(keys))
}

/// `(page, page_size)` from `page` and `pageSize`
fn paging(ctx: &RequestContext) -> Result<Option<(i64, usize)>> {
    let page = ctx
        .param(PAGE_PARAM)
        .map(|raw| {
            raw.trim().parse::<i64>().map_err(|_| {
                GraphPathError::InvalidRequest(format!("Invalid {PAGE_PARAM} '{raw}'"))
            })
        })
        .transpose()?;

    let page_size = ctx
        .param(PAGE_SIZE_PARAM)
        .map(|raw| match raw.trim().parse::<i64>() {
            Ok(size) if size > 0 => Ok(size as usize),
            _ => Err(GraphPathError::InvalidRequest(format!(
                "Invalid {PAGE_SIZE_PARAM} '{raw}', expected a positive number"
            ))),
        })
        .transpose()?;

    let engine = &ctx.engine;
    Ok(match (page, page_size) {
        (None, None) => None,
        (Some(page), None) => Some((page, engine.default_page_size.min(engine.max_page_size))),
        (page, Some(size)) => Some((page.unwrap_or(1), size.min(engine.max_page_size))),
    })
}

// ============================================================================
// Dispatch
// ============================================================================

/// Answer of a verb applied to a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(ResourceResult),
    Head(HeadResult),
    Options(Vec<Verb>),
}

/// Apply `verb` to `resource`
pub async fn execute(
    resource: &Resource,
    verb: Verb,
    ctx: &RequestContext,
    body: &Value,
) -> Result<Outcome> {
    let outcome = match verb {
        Verb::Get => Outcome::Result(resource.get(ctx).await?),
        Verb::Head => Outcome::Head(resource.head(ctx).await?),
        Verb::Post => Outcome::Result(resource.post(ctx, body).await?),
        Verb::Put => Outcome::Result(resource.put(ctx, body).await?),
        Verb::Delete => Outcome::Result(resource.delete(ctx).await?),
        Verb::Options => Outcome::Options(resource.options()),
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use graphpath_core::{EngineConfig, Schema};
    use graphpath_graph::MemoryGraphStore;
    use std::sync::Arc;

    fn context(params: &[(&str, &str)]) -> RequestContext {
        let schema = Arc::new(
            Schema::from_toml_str(
                r#"
                [[type]]
                name = "Person"
                properties = { name = "string" }
                "#,
            )
            .unwrap(),
        );
        let store = Arc::new(MemoryGraphStore::new(schema.clone()));
        let engine = EngineConfig {
            default_page_size: 10,
            max_page_size: 50,
            traversal_node_limit: None,
        };
        RequestContext::new(store, schema, engine).with_params(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn paging_of(resource: &Resource) -> (i64, usize) {
        match resource {
            Resource::Paging(p) => (p.page, p.page_size),
            other => panic!("expected paging, got {}", other.kind()),
        }
    }

    #[test]
    fn test_empty_path_is_not_found() {
        let err = resolve("/", &context(&[])).unwrap_err();
        assert!(matches!(err, GraphPathError::NotFound(_)));
    }

    #[test]
    fn test_paging_defaults() {
        let page_only = resolve("persons", &context(&[("page", "2")])).unwrap();
        assert_eq!(paging_of(&page_only), (2, 10));

        let size_only = resolve("persons", &context(&[("pageSize", "5")])).unwrap();
        assert_eq!(paging_of(&size_only), (1, 5));

        let clamped = resolve("persons", &context(&[("page", "1"), ("pageSize", "500")])).unwrap();
        assert_eq!(paging_of(&clamped), (1, 50));
    }

    #[test]
    fn test_invalid_page_size() {
        for size in ["0", "-3", "ten"] {
            let err = resolve("persons", &context(&[("pageSize", size)])).unwrap_err();
            assert!(matches!(err, GraphPathError::InvalidRequest(_)), "{size}");
        }
    }

    #[test]
    fn test_sort_then_paging() {
        let resource = resolve(
            "Person",
            &context(&[("sort", "name,employer.name"), ("order", "desc"), ("page", "1")]),
        )
        .unwrap();
        let Resource::Paging(_) = &resource else {
            panic!("paging must be outermost");
        };
        assert_eq!(resource.uri_part(), "Person");
        assert_eq!(resource.signature(), "Person");
    }

    #[test]
    fn test_sort_keys() {
        let keys = sort_keys(&context(&[("sort", "name, employer.name"), ("order", "DESC")]))
            .unwrap()
            .unwrap();
        assert_eq!(keys[0], SortOrder::descending(SortKey::Property("name".into())));
        assert_eq!(
            keys[1],
            SortOrder::descending(SortKey::Path(vec!["employer".into(), "name".into()]))
        );
        assert!(sort_keys(&context(&[("order", "desc")])).unwrap().is_none());
        assert!(sort_keys(&context(&[("sort", "name"), ("order", "up")])).is_err());
    }

    #[tokio::test]
    async fn test_options_lists_verbs() {
        let ctx = context(&[]);
        let resource = resolve("persons", &ctx).unwrap();
        assert_eq!(resource.kind(), ResourceKind::Type);
        let Outcome::Options(verbs) = execute(&resource, Verb::Options, &ctx, &Value::Null)
            .await
            .unwrap()
        else {
            panic!("expected verbs");
        };
        assert_eq!(
            verbs,
            vec![Verb::Get, Verb::Head, Verb::Post, Verb::Delete, Verb::Options]
        );
    }
}
