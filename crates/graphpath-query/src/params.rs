//! Query-string translation
//!
//! Turns the query parameters of a collection request into an AND
//! predicate over the resolved type:
//!
//! - `[a TO b]` / `{a TO b}` become inclusive / exclusive ranges, `*` leaves
//!   a side unbounded
//! - `a;b` becomes an OR of equalities
//! - anything else is an equality leaf, converted to the declared type
//!
//! `page`, `pageSize`, `sort`, `order` and `loose` are reserved and handled
//! by the resource layer.

use crate::predicate::{GroupBuilder, Predicate};
use graphpath_core::{GraphPathError, Result, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "pageSize";
pub const SORT_PARAM: &str = "sort";
pub const ORDER_PARAM: &str = "order";
pub const LOOSE_PARAM: &str = "loose";

pub const RESERVED_PARAMS: [&str; 5] =
    [PAGE_PARAM, PAGE_SIZE_PARAM, SORT_PARAM, ORDER_PARAM, LOOSE_PARAM];

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([\[{])\s*(.+?)\s+TO\s+(.+?)\s*([\]}])\s*$").expect("range pattern compiles")
});

pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

/// Whether `loose` asks for tokenized matching
pub fn is_loose(params: &[(String, String)]) -> bool {
    params
        .iter()
        .any(|(k, v)| k == LOOSE_PARAM && matches!(v.as_str(), "" | "1" | "true" | "yes"))
}

/// Translate the non-reserved parameters into an AND predicate
pub fn predicate_from_params(
    schema: &Schema,
    entity_type: &str,
    params: &[(String, String)],
) -> Result<Predicate> {
    let exact = !is_loose(params);
    let mut builder = GroupBuilder::and();

    for (key, raw) in params {
        if is_reserved(key) {
            continue;
        }
        if !schema.has_property(entity_type, key) {
            return Err(GraphPathError::invalid_search_field(entity_type, key.as_str()));
        }

        if let Some(range) = parse_range(raw) {
            builder = builder.param_with(key.as_str(), range, exact);
        } else if raw.contains(';') {
            let alternatives = raw
                .split(';')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| convert(schema, entity_type, key, part).map(Predicate::Equals))
                .collect::<Result<Vec<_>>>()?;
            let or = alternatives
                .into_iter()
                .fold(GroupBuilder::or(), GroupBuilder::child)
                .build();
            builder = builder.param_with(key.as_str(), or, exact);
        } else {
            let value = convert(schema, entity_type, key, raw)?;
            builder = builder.param_with(key.as_str(), value, exact);
        }
    }

    Ok(builder.build())
}

/// Parse `[a TO b]` style ranges; bounds stay strings and are converted when lowered
pub fn parse_range(raw: &str) -> Option<Predicate> {
    let captures = RANGE_PATTERN.captures(raw)?;
    let bound = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str())
            .filter(|s| *s != "*")
            .map(|s| Value::String(s.to_string()))
    };

    Some(Predicate::range(
        bound(2),
        bound(3),
        captures.get(1).map(|m| m.as_str()) == Some("["),
        captures.get(4).map(|m| m.as_str()) == Some("]"),
    ))
}

fn convert(schema: &Schema, entity_type: &str, key: &str, raw: &str) -> Result<Value> {
    let raw = Value::String(raw.to_string());
    match schema.input_converter(entity_type, key) {
        Some(value_type) => value_type
            .convert(&raw)
            .map_err(|e| GraphPathError::InvalidRequest(format!("{key}: {e}"))),
        None => Ok(raw),
    }
}
