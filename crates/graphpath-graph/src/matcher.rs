//! Attribute-tree evaluation
//!
//! Decides whether one entity satisfies a lowered [`QueryGroup`]. Property
//! values are fetched through a lookup closure so the same code serves
//! nodes and relationships.

use graphpath_core::{compare_values, Matcher, Operation, QueryGroup, QueryNode, SearchAttribute};
use serde_json::Value;
use std::cmp::Ordering;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Evaluate a group against the values exposed by `lookup`
pub fn matches_group<F>(group: &QueryGroup, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<Value>,
{
    let mut results = group.children.iter().map(|child| match child {
        QueryNode::Attribute(attr) => matches_attribute(attr, lookup),
        QueryNode::Group(inner) => matches_group(inner, lookup),
    });

    match group.operation {
        Operation::And => results.all(|r| r),
        Operation::Or => group.children.is_empty() || results.any(|r| r),
        // NOT inverts the conjunction of its children
        Operation::Not => !results.all(|r| r),
    }
}

/// Evaluate a single leaf
pub fn matches_attribute<F>(attr: &SearchAttribute, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<Value>,
{
    if let Matcher::Within {
        latitude,
        longitude,
        distance_meters,
    } = &attr.matcher
    {
        let lat = lookup("latitude").and_then(|v| v.as_f64());
        let lon = lookup("longitude").and_then(|v| v.as_f64());
        return match (lat, lon) {
            (Some(lat), Some(lon)) => {
                haversine_meters(*latitude, *longitude, lat, lon) <= *distance_meters
            }
            _ => false,
        };
    }

    let Some(value) = lookup(&attr.property) else {
        // Only a null comparison matches an absent property
        return matches!(&attr.matcher, Matcher::Equals(Value::Null));
    };

    // Collection-valued properties match if any element matches
    if let Value::Array(items) = &value {
        if !matches!(attr.matcher, Matcher::Equals(Value::Array(_))) {
            return items.iter().any(|item| matches_value(attr, item));
        }
    }

    matches_value(attr, &value)
}

fn matches_value(attr: &SearchAttribute, value: &Value) -> bool {
    match &attr.matcher {
        Matcher::Equals(expected) => {
            if attr.exact {
                values_equal(value, expected)
            } else {
                fuzzy_equal(value, expected)
            }
        }
        Matcher::StartsWith(prefix) => match value.as_str() {
            Some(s) if attr.exact => s.starts_with(prefix.as_str()),
            Some(s) => s.to_lowercase().starts_with(&prefix.to_lowercase()),
            None => false,
        },
        Matcher::EndsWith(suffix) => match value.as_str() {
            Some(s) if attr.exact => s.ends_with(suffix.as_str()),
            Some(s) => s.to_lowercase().ends_with(&suffix.to_lowercase()),
            None => false,
        },
        Matcher::Range {
            start,
            end,
            include_start,
            include_end,
        } => {
            let above = match start {
                None => true,
                Some(bound) => match compare_values(value, bound) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *include_start,
                    _ => false,
                },
            };
            let below = match end {
                None => true,
                Some(bound) => match compare_values(value, bound) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *include_end,
                    _ => false,
                },
            };
            above && below
        }
        Matcher::AnyOf(candidates) => candidates.iter().any(|c| values_equal(value, c)),
        Matcher::Within { .. } => false,
    }
}

/// Literal equality; numbers compare numerically regardless of representation
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Tokenized, case-insensitive match: every token of the query must occur
fn fuzzy_equal(value: &Value, expected: &Value) -> bool {
    match (value.as_str(), expected.as_str()) {
        (Some(haystack), Some(needle)) => {
            let haystack = haystack.to_lowercase();
            let mut tokens = needle.split_whitespace().peekable();
            if tokens.peek().is_none() {
                return haystack.trim().is_empty();
            }
            tokens.all(|token| haystack.contains(&token.to_lowercase()))
        }
        _ => values_equal(value, expected),
    }
}

/// Great-circle distance between two points
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
