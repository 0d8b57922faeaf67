//! Schema definitions
//!
//! The schema names every entity type, its properties and their value
//! types, the views a type can be projected to, and the relationships that
//! are statically declared between pairs of types. It is loaded once from
//! TOML and shared read-only by all requests.

use crate::{Direction, GraphPathError, Result, ID_KEY, TYPE_KEY};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

// ============================================================================
// Value Types
// ============================================================================

/// Declared value type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 timestamp stored as a string
    Date,
    /// Arbitrary JSON, never converted
    Json,
}

/// A raw value could not be converted to the declared type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {value} to {target:?}")]
pub struct ConversionError {
    pub value: String,
    pub target: ValueType,
}

impl ValueType {
    /// True when `value` already has the runtime shape of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Date => value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            Self::Json => true,
        }
    }

    /// Input converter: coerce a raw (usually string) value to this type
    pub fn convert(&self, value: &Value) -> std::result::Result<Value, ConversionError> {
        if self.accepts(value) {
            return Ok(value.clone());
        }

        let converted = self.coerce(value);
        if let Err(e) = &converted {
            tracing::debug!(value = %e.value, target = ?e.target, "Input conversion failed");
        }
        converted
    }

    fn coerce(&self, value: &Value) -> std::result::Result<Value, ConversionError> {
        let fail = || ConversionError {
            value: value.to_string(),
            target: *self,
        };

        match self {
            Self::String => match value {
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            Self::Integer => match value {
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| fail()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            Self::Float => match value {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(fail),
                _ => Err(fail()),
            },
            Self::Boolean => match value {
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(fail()),
                },
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Value::Bool(false)),
                    Some(1) => Ok(Value::Bool(true)),
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            Self::Date => match value {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                    .map(format_date)
                    .ok_or_else(fail),
                Value::String(s) => parse_date(s.trim()).map(format_date).ok_or_else(fail),
                _ => Err(fail()),
            },
            Self::Json => Ok(value.clone()),
        }
    }
}

/// 2^63, the first float outside the `i64` range
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn format_date(dt: DateTime<Utc>) -> Value {
    Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// ============================================================================
// Schema Model
// ============================================================================

/// Entity type definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityType {
    /// Type name, e.g. "Person"
    pub name: String,

    /// Parent type (for inheritance)
    #[serde(default)]
    pub parent: Option<String>,

    /// Declared properties and their value types
    #[serde(default)]
    pub properties: BTreeMap<String, ValueType>,

    /// Named projections, e.g. `public = ["name"]`
    #[serde(default)]
    pub views: BTreeMap<String, Vec<String>>,
}

/// A statically declared relationship between two entity types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredRelationship {
    /// Relationship type stored on the edge
    pub rel_type: String,

    /// Start node type
    pub source: String,

    /// End node type
    pub target: String,

    /// Property name on the source type that follows this relationship
    #[serde(default)]
    pub source_property: Option<String>,

    /// Property name on the target type that follows this relationship backwards
    #[serde(default)]
    pub target_property: Option<String>,
}

/// Result of looking up the declared relationship between two types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMatch<'a> {
    pub rel_type: &'a str,
    /// Direction as seen from the first type
    pub direction: Direction,
    pub declaration: &'a DeclaredRelationship,
}

/// A path segment recognised as a type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMatch {
    pub name: String,
    /// Whether subtypes are included
    pub inheriting: bool,
}

/// The complete schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "type")]
    pub types: Vec<EntityType>,

    #[serde(default, rename = "relationship")]
    pub relationships: Vec<DeclaredRelationship>,
}

impl Schema {
    /// Parse and validate a schema from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let schema: Schema = toml::from_str(content)
            .map_err(|e| GraphPathError::Config(format!("Invalid schema: {e}")))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraphPathError::Config(format!("Failed to read schema {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check that names are unique and every reference points to a known type
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for ty in &self.types {
            if !seen.insert(ty.name.as_str()) {
                return Err(GraphPathError::Config(format!(
                    "Duplicate type {}",
                    ty.name
                )));
            }
        }

        for ty in &self.types {
            if let Some(parent) = &ty.parent {
                if !seen.contains(parent.as_str()) {
                    return Err(GraphPathError::Config(format!(
                        "Type {} extends unknown type {parent}",
                        ty.name
                    )));
                }
            }
            // Walking the chain terminates only if there is no cycle
            let mut chain = HashSet::new();
            let mut current = Some(ty.name.as_str());
            while let Some(name) = current {
                if !chain.insert(name) {
                    return Err(GraphPathError::Config(format!(
                        "Inheritance cycle through {}",
                        ty.name
                    )));
                }
                current = self.entity_type(name).and_then(|t| t.parent.as_deref());
            }
        }

        for rel in &self.relationships {
            for end in [&rel.source, &rel.target] {
                if !seen.contains(end.as_str()) {
                    return Err(GraphPathError::Config(format!(
                        "Relationship {} references unknown type {end}",
                        rel.rel_type
                    )));
                }
            }
        }

        Ok(())
    }

    /// Look up a type by its exact name
    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// The type itself followed by its ancestors
    pub fn ancestors<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = self.entity_type(name);
        while let Some(ty) = current {
            if chain.contains(&ty.name.as_str()) {
                break;
            }
            chain.push(ty.name.as_str());
            current = ty.parent.as_deref().and_then(|p| self.entity_type(p));
        }
        chain
    }

    /// True when `ty` equals `ancestor` or inherits from it
    pub fn is_assignable(&self, ty: &str, ancestor: &str) -> bool {
        self.ancestors(ty).contains(&ancestor)
    }

    /// The type and every type inheriting from it
    pub fn subtypes<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.types
            .iter()
            .filter(|t| self.is_assignable(&t.name, name))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Recognise a path segment as a type.
    ///
    /// The exact type name selects the type and its subtypes; the lower-case
    /// name or its plural selects the exact type only.
    pub fn resolve_type_segment(&self, segment: &str) -> Option<TypeMatch> {
        if let Some(ty) = self.entity_type(segment) {
            return Some(TypeMatch {
                name: ty.name.clone(),
                inheriting: true,
            });
        }

        self.types
            .iter()
            .find(|t| {
                let lower = t.name.to_lowercase();
                segment == lower || segment == pluralize(&lower)
            })
            .map(|t| TypeMatch {
                name: t.name.clone(),
                inheriting: false,
            })
    }

    /// Value type of a property, searching the inheritance chain.
    ///
    /// The built-in `id` and `type` keys are strings on every type.
    pub fn property_type(&self, entity_type: &str, key: &str) -> Option<ValueType> {
        if key == ID_KEY || key == TYPE_KEY {
            return Some(ValueType::String);
        }
        self.ancestors(entity_type)
            .into_iter()
            .filter_map(|name| self.entity_type(name))
            .find_map(|ty| ty.properties.get(key).copied())
    }

    pub fn has_property(&self, entity_type: &str, key: &str) -> bool {
        self.property_type(entity_type, key).is_some()
    }

    /// Input converter for a property, if the property is declared
    pub fn input_converter(&self, entity_type: &str, key: &str) -> Option<ValueType> {
        self.property_type(entity_type, key)
    }

    /// Every view name declared on any type
    pub fn view_names(&self) -> BTreeSet<&str> {
        self.types
            .iter()
            .flat_map(|t| t.views.keys().map(String::as_str))
            .collect()
    }

    /// Property list of a view, searching the inheritance chain
    pub fn view(&self, entity_type: &str, view: &str) -> Option<&[String]> {
        self.ancestors(entity_type)
            .into_iter()
            .filter_map(|name| self.entity_type(name))
            .find_map(|ty| ty.views.get(view).map(Vec::as_slice))
    }

    /// The relationship statically declared between two types, if any.
    ///
    /// Outgoing when `from` is the declared source, incoming when it is the
    /// declared target. Inheritance applies on both ends.
    pub fn declared_relationship(&self, from: &str, to: &str) -> Option<RelationshipMatch<'_>> {
        self.relationships.iter().find_map(|rel| {
            if self.is_assignable(from, &rel.source) && self.is_assignable(to, &rel.target) {
                Some(RelationshipMatch {
                    rel_type: &rel.rel_type,
                    direction: Direction::Outgoing,
                    declaration: rel,
                })
            } else if self.is_assignable(from, &rel.target) && self.is_assignable(to, &rel.source)
            {
                Some(RelationshipMatch {
                    rel_type: &rel.rel_type,
                    direction: Direction::Incoming,
                    declaration: rel,
                })
            } else {
                None
            }
        })
    }

    /// Follow a relationship property such as `employer` from a type
    pub fn relationship_by_property(
        &self,
        entity_type: &str,
        property: &str,
    ) -> Option<RelationshipMatch<'_>> {
        self.relationships.iter().find_map(|rel| {
            if rel.source_property.as_deref() == Some(property)
                && self.is_assignable(entity_type, &rel.source)
            {
                Some(RelationshipMatch {
                    rel_type: &rel.rel_type,
                    direction: Direction::Outgoing,
                    declaration: rel,
                })
            } else if rel.target_property.as_deref() == Some(property)
                && self.is_assignable(entity_type, &rel.target)
            {
                Some(RelationshipMatch {
                    rel_type: &rel.rel_type,
                    direction: Direction::Incoming,
                    declaration: rel,
                })
            } else {
                None
            }
        })
    }

    /// Look up a declared relationship by its type name
    pub fn relationship_type(&self, rel_type: &str) -> Option<&DeclaredRelationship> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    /// JSON description of one type, used by the schema resource
    pub fn describe_type(&self, name: &str) -> Option<Value> {
        let ty = self.entity_type(name)?;
        let mut properties = serde_json::Map::new();
        for ancestor in self.ancestors(name).into_iter().rev() {
            if let Some(def) = self.entity_type(ancestor) {
                for (key, value_type) in &def.properties {
                    properties.insert(key.clone(), serde_json::json!(value_type));
                }
            }
        }

        let relationships: Vec<Value> = self
            .relationships
            .iter()
            .filter(|r| self.is_assignable(name, &r.source) || self.is_assignable(name, &r.target))
            .map(|r| serde_json::json!(r))
            .collect();

        Some(serde_json::json!({
            "name": ty.name,
            "parent": ty.parent,
            "properties": properties,
            "views": ty.views,
            "relationships": relationships,
        }))
    }
}

/// English plural of a lower-case type name
fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

// ============================================================================
// Tests
// ============================================================================
