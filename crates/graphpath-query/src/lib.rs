//! graphpath Query - Predicate composition engine
//!
//! Builds AND/OR/NOT/range/comparison trees from function-style predicate
//! calls and lowers them into the grouped boolean [`Query`] consumed by a
//! [`GraphStore`]:
//!
//! ```ignore
//! let criteria = GroupBuilder::and()
//!     .param("name", Predicate::starts_with("Ad"))
//!     .param("age", Predicate::range(Some(json!(30)), None, true, false))
//!     .child(Predicate::sort("age", true))
//!     .build();
//! let people = find(store.as_ref(), &schema, "Person", &criteria, true).await?;
//! ```

pub mod lowering;
pub mod params;
pub mod predicate;

pub use lowering::LOCATION_KEY;
pub use params::{is_loose, is_reserved, parse_range, predicate_from_params, RESERVED_PARAMS};
pub use predicate::{Group, GroupBuilder, Parameter, ParameterValue, Predicate};

use graphpath_core::{Entity, GraphPathError, GraphStore, Query, Result, Schema};
use tracing::debug;

/// Lower `criteria` for `entity_type` into a fresh query.
///
/// An exact type name includes its subtypes.
pub fn build_query(
    schema: &Schema,
    entity_type: &str,
    criteria: &Predicate,
    exact: bool,
) -> Result<Query> {
    if schema.entity_type(entity_type).is_none() {
        return Err(GraphPathError::not_found(format!("Type {entity_type}")));
    }

    let mut query = Query::for_type(entity_type, true);
    criteria.configure_query(schema, entity_type, None, &mut query, exact)?;
    query.close_all();

    debug!(
        entity_type,
        leaves = query.filter().attributes().len(),
        depth = query.filter().depth(),
        "Lowered predicate"
    );
    Ok(query)
}

/// Search `store` for entities of `entity_type` matching `criteria`
pub async fn find(
    store: &dyn GraphStore,
    schema: &Schema,
    entity_type: &str,
    criteria: &Predicate,
    exact: bool,
) -> Result<Vec<Entity>> {
    let query = build_query(schema, entity_type, criteria, exact)?;
    store.search(&query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_query_rejects_unknown_type() {
        let schema = Schema::default();
        let err = build_query(&schema, "Dog", &GroupBuilder::and().build(), true).unwrap_err();
        assert!(matches!(err, GraphPathError::NotFound(_)));
    }

    #[test]
    fn test_build_query_targets_subtypes() {
        let schema = Schema::from_toml_str(
            r#"
            [[type]]
            name = "Person"
            properties = { name = "string" }
            "#,
        )
        .unwrap();

        let query = build_query(
            &schema,
            "Person",
            &GroupBuilder::and().param("name", json!("Ada")).build(),
            true,
        )
        .unwrap();
        assert_eq!(query.entity_type.as_deref(), Some("Person"));
        assert!(query.include_subtypes);
        assert_eq!(query.filter().attributes().len(), 1);
    }
}
