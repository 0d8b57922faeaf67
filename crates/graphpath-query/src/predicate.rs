//! Predicate tree
//!
//! Predicates are built bottom-up and never mutated afterwards. Leaf kinds
//! carry a comparison; group kinds carry keyed parameters plus unkeyed child
//! predicates.

use graphpath_core::Operation;
use serde::Serialize;
use serde_json::Value;

/// Value attached to a group parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Compared for equality with the parameter's exactness
    Value(Value),
    /// Lowered with the parameter key as its base key
    Predicate(Predicate),
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<Predicate> for ParameterValue {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

/// A `(key, value, exact)` entry of a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub key: String,
    pub value: ParameterValue,
    pub exact: bool,
}

/// Children of an AND/OR/NOT predicate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Group {
    pub parameters: Vec<Parameter>,
    pub predicates: Vec<Predicate>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.predicates.is_empty()
    }
}

/// One node of a boolean query expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals(Value),
    StartsWith {
        key: Option<String>,
        value: String,
    },
    EndsWith {
        key: Option<String>,
        value: String,
    },
    /// Either bound may be absent for a half-open range
    Range {
        key: Option<String>,
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    },
    Location {
        latitude: f64,
        longitude: f64,
        distance_meters: f64,
    },
    Any(Vec<Value>),
    And(Group),
    Or(Group),
    Not(Group),
    Sort {
        key: String,
        descending: bool,
    },
    SortByPath {
        path: Vec<String>,
        descending: bool,
    },
    Page {
        page: i64,
        page_size: usize,
    },
}

impl Predicate {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    /// Prefix match on the property supplied by the enclosing parameter
    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::StartsWith {
            key: None,
            value: value.into(),
        }
    }

    /// Standalone prefix match on `key`
    pub fn starts_with_key(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::EndsWith {
            key: None,
            value: value.into(),
        }
    }

    pub fn ends_with_key(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EndsWith {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    pub fn range(
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    ) -> Self {
        Self::Range {
            key: None,
            start,
            end,
            include_start,
            include_end,
        }
    }

    pub fn range_key(
        key: impl Into<String>,
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    ) -> Self {
        Self::Range {
            key: Some(key.into()),
            start,
            end,
            include_start,
            include_end,
        }
    }

    pub fn within(latitude: f64, longitude: f64, distance_meters: f64) -> Self {
        Self::Location {
            latitude,
            longitude,
            distance_meters,
        }
    }

    pub fn any(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Any(values.into_iter().collect())
    }

    pub fn sort(key: impl Into<String>, descending: bool) -> Self {
        Self::Sort {
            key: key.into(),
            descending,
        }
    }

    /// Sort by a dotted path such as `employer.name`
    pub fn sort_by_path(path: &str, descending: bool) -> Self {
        Self::SortByPath {
            path: path.split('.').map(str::to_string).collect(),
            descending,
        }
    }

    pub fn page(page: i64, page_size: usize) -> Self {
        Self::Page { page, page_size }
    }

    /// Combinator of a group predicate
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::And(_) => Some(Operation::And),
            Self::Or(_) => Some(Operation::Or),
            Self::Not(_) => Some(Operation::Not),
            _ => None,
        }
    }
}

/// Bottom-up builder for group predicates
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    operation: Operation,
    group: Group,
}

impl GroupBuilder {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            group: Group::default(),
        }
    }

    pub fn and() -> Self {
        Self::new(Operation::And)
    }

    pub fn or() -> Self {
        Self::new(Operation::Or)
    }

    pub fn not() -> Self {
        Self::new(Operation::Not)
    }

    /// Add an exact parameter
    pub fn param(self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.param_with(key, value, true)
    }

    /// Add a tokenized (inexact) parameter
    pub fn loose_param(self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.param_with(key, value, false)
    }

    pub fn param_with(
        mut self,
        key: impl Into<String>,
        value: impl Into<ParameterValue>,
        exact: bool,
    ) -> Self {
        self.group.parameters.push(Parameter {
            key: key.into(),
            value: value.into(),
            exact,
        });
        self
    }

    /// Add an unkeyed child predicate
    pub fn child(mut self, predicate: Predicate) -> Self {
        self.group.predicates.push(predicate);
        self
    }

    pub fn build(self) -> Predicate {
        match self.operation {
            Operation::And => Predicate::And(self.group),
            Operation::Or => Predicate::Or(self.group),
            Operation::Not => Predicate::Not(self.group),
        }
    }
}
