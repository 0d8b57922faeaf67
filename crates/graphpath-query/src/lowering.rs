//! Lowering predicates into a [`Query`]
//!
//! Every predicate kind knows how to add itself to the query being built
//! for one entity type. `base_key` is set when the predicate is the value of
//! a keyed parameter (`{age: range(30, null)}`) and absent for freestanding
//! combinators.
//!
//! AND and NOT build isolated subgroups that are dropped when empty. OR joins
//! the builder's bracketing instead, so nested ORs flatten into the
//! enclosing OR group.

use crate::predicate::{Group, ParameterValue, Predicate};
use graphpath_core::{
    GraphPathError, Matcher, Operation, PageRequest, Query, Result, Schema, SearchAttribute,
    SortKey, SortOrder,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Property used by location predicates without a base key
pub const LOCATION_KEY: &str = "location";

impl Predicate {
    /// Add this predicate to `query`
    pub fn configure_query(
        &self,
        schema: &Schema,
        entity_type: &str,
        base_key: Option<&str>,
        query: &mut Query,
        exact: bool,
    ) -> Result<()> {
        match self {
            Self::Equals(value) => {
                let Some(key) = base_key else {
                    debug!("equals() used without a property, ignored");
                    return Ok(());
                };
                check_key(schema, entity_type, key)?;
                // Equality is always literal
                query.attribute(SearchAttribute::equals(key, value.clone(), true));
            }

            Self::StartsWith { key, value } => {
                if let Some(key) = single_key(base_key, key.as_deref(), "startsWith") {
                    check_key(schema, entity_type, key)?;
                    query.attribute(SearchAttribute::new(
                        key,
                        Matcher::StartsWith(value.clone()),
                        exact,
                    ));
                }
            }

            Self::EndsWith { key, value } => {
                if let Some(key) = single_key(base_key, key.as_deref(), "endsWith") {
                    check_key(schema, entity_type, key)?;
                    query.attribute(SearchAttribute::new(
                        key,
                        Matcher::EndsWith(value.clone()),
                        exact,
                    ));
                }
            }

            Self::Range {
                key,
                start,
                end,
                include_start,
                include_end,
            } => {
                if let Some(key) = single_key(base_key, key.as_deref(), "range") {
                    check_key(schema, entity_type, key)?;
                    let matcher = Matcher::Range {
                        start: start.as_ref().map(|v| coerce(schema, entity_type, key, v)),
                        end: end.as_ref().map(|v| coerce(schema, entity_type, key, v)),
                        include_start: *include_start,
                        include_end: *include_end,
                    };
                    query.attribute(SearchAttribute::new(key, matcher, exact));
                }
            }

            Self::Location {
                latitude,
                longitude,
                distance_meters,
            } => {
                let matcher = Matcher::Within {
                    latitude: *latitude,
                    longitude: *longitude,
                    distance_meters: *distance_meters,
                };
                query.attribute(SearchAttribute::new(
                    base_key.unwrap_or(LOCATION_KEY),
                    matcher,
                    true,
                ));
            }

            Self::Any(values) => {
                let Some(key) = base_key else {
                    debug!("any() used without a property, ignored");
                    return Ok(());
                };
                check_key(schema, entity_type, key)?;
                let values = values
                    .iter()
                    .map(|v| coerce(schema, entity_type, key, v))
                    .collect();
                query.attribute(SearchAttribute::new(key, Matcher::AnyOf(values), true));
            }

            Self::And(group) => {
                query.begin(Operation::And);
                let lowered = group.lower(schema, entity_type, base_key, query, exact, false);
                query.end();
                lowered?;
            }

            Self::Not(group) => {
                query.begin(Operation::Not);
                let lowered = group.lower(schema, entity_type, base_key, query, exact, true);
                query.end();
                lowered?;
            }

            Self::Or(group) => {
                let bracket = query.or();
                let lowered = group.lower(schema, entity_type, base_key, query, exact, false);
                query.parent(bracket);
                lowered?;
            }

            Self::Sort { key, descending } => {
                query.sort_by(SortOrder {
                    key: SortKey::Property(key.clone()),
                    descending: *descending,
                });
            }

            Self::SortByPath { path, descending } => {
                query.sort_by(SortOrder {
                    key: SortKey::Path(path.clone()),
                    descending: *descending,
                });
            }

            Self::Page { page, page_size } => {
                if *page == 0 {
                    warn!(page_size, "page(0) requested; pages are 1-based, using page 1");
                }
                query.paginate(PageRequest::new(*page, *page_size));
            }
        }

        Ok(())
    }
}

impl Group {
    /// Lower parameters, then child predicates, into the innermost open group.
    ///
    /// With `conjoin` (NOT groups) a parameter is exact only if both the
    /// group and the parameter are; otherwise the parameter's own exactness
    /// is used.
    fn lower(
        &self,
        schema: &Schema,
        entity_type: &str,
        base_key: Option<&str>,
        query: &mut Query,
        exact: bool,
        conjoin: bool,
    ) -> Result<()> {
        for param in &self.parameters {
            let leaf_exact = if conjoin {
                exact && param.exact
            } else {
                param.exact
            };
            match &param.value {
                ParameterValue::Value(value) => {
                    check_key(schema, entity_type, &param.key)?;
                    query.attribute(SearchAttribute::equals(
                        param.key.as_str(),
                        value.clone(),
                        leaf_exact,
                    ));
                }
                ParameterValue::Predicate(predicate) => {
                    predicate.configure_query(
                        schema,
                        entity_type,
                        Some(&param.key),
                        query,
                        leaf_exact,
                    )?;
                }
            }
        }

        for predicate in &self.predicates {
            predicate.configure_query(schema, entity_type, base_key, query, exact)?;
        }

        Ok(())
    }
}

/// Exactly one of the base key and the predicate's own key must be present
fn single_key<'a>(base_key: Option<&'a str>, own_key: Option<&'a str>, kind: &str) -> Option<&'a str> {
    match (base_key, own_key) {
        (Some(key), None) | (None, Some(key)) => Some(key),
        (Some(base), Some(own)) => {
            debug!(kind, base, own, "Predicate has both a base key and its own key, ignored");
            None
        }
        (None, None) => {
            debug!(kind, "Predicate has no property key, ignored");
            None
        }
    }
}

fn check_key(schema: &Schema, entity_type: &str, key: &str) -> Result<()> {
    if schema.has_property(entity_type, key) {
        Ok(())
    } else {
        Err(GraphPathError::invalid_search_field(entity_type, key))
    }
}

/// Convert `value` to the declared type of `key`, keeping it unchanged on failure
fn coerce(schema: &Schema, entity_type: &str, key: &str, value: &Value) -> Value {
    let Some(value_type) = schema.input_converter(entity_type, key) else {
        return value.clone();
    };
    if value_type.accepts(value) {
        return value.clone();
    }
    match value_type.convert(value) {
        Ok(converted) => converted,
        Err(e) => {
            debug!(key, error = %e, "Keeping unconverted value");
            value.clone()
        }
    }
}
