//! Lowered query representation
//!
//! A search is a tree of [`QueryGroup`]s whose leaves are
//! [`SearchAttribute`]s. [`Query`] wraps the root group together with the
//! target type, ordering and pagination, and offers two ways of growing the
//! tree:
//!
//! - isolated subtrees via [`Query::begin`] / [`Query::end`], appended to the
//!   enclosing group only when non-empty
//! - bracketing via [`Query::or`] / [`Query::parent`], which joins an already
//!   open OR group instead of nesting a new one

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Boolean combinator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    And,
    Or,
    /// Inverts the combined (AND) truth value of its children
    Not,
}

/// How a leaf compares the property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Equals(Value),
    StartsWith(String),
    EndsWith(String),
    Range {
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    },
    /// Membership in a set of values
    AnyOf(Vec<Value>),
    /// Geospatial radius around a point
    Within {
        latitude: f64,
        longitude: f64,
        distance_meters: f64,
    },
}

/// Leaf of the query tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAttribute {
    pub property: String,
    pub matcher: Matcher,
    /// Literal comparison when true, tokenized/fuzzy otherwise
    pub exact: bool,
}

impl SearchAttribute {
    pub fn new(property: impl Into<String>, matcher: Matcher, exact: bool) -> Self {
        Self {
            property: property.into(),
            matcher,
            exact,
        }
    }

    pub fn equals(property: impl Into<String>, value: impl Into<Value>, exact: bool) -> Self {
        Self::new(property, Matcher::Equals(value.into()), exact)
    }
}

/// Child of a group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryNode {
    Attribute(SearchAttribute),
    Group(QueryGroup),
}

/// Composite node of the query tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryGroup {
    pub operation: Operation,
    pub children: Vec<QueryNode>,
}

impl QueryGroup {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            children: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: SearchAttribute) {
        self.children.push(QueryNode::Attribute(attribute));
    }

    /// Append a subtree; empty groups are dropped so they never constrain a query.
    ///
    /// Returns whether the group was appended.
    pub fn add_group(&mut self, group: QueryGroup) -> bool {
        if group.is_empty() {
            return false;
        }
        self.children.push(QueryNode::Group(group));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Every leaf in depth-first order
    pub fn attributes(&self) -> Vec<&SearchAttribute> {
        let mut leaves = Vec::new();
        for child in &self.children {
            match child {
                QueryNode::Attribute(attr) => leaves.push(attr),
                QueryNode::Group(group) => leaves.extend(group.attributes()),
            }
        }
        leaves
    }

    /// Nesting depth (a group without subgroups has depth 1)
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                QueryNode::Group(g) => g.depth(),
                QueryNode::Attribute(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// The direct child groups
    pub fn groups(&self) -> impl Iterator<Item = &QueryGroup> {
        self.children.iter().filter_map(|c| match c {
            QueryNode::Group(g) => Some(g),
            QueryNode::Attribute(_) => None,
        })
    }
}

/// Sort key of a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// A property of the result entity
    Property(String),
    /// A dotted path through related entities, e.g. `employer.name`
    Path(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub descending: bool,
}

impl SortOrder {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }

    /// Compare two sort values under this clause
    pub fn compare(&self, a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let ordering = compare_for_sort(a, b);
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Order two values of comparable kinds.
///
/// Numbers compare numerically, RFC 3339 strings chronologically, other
/// strings lexicographically. Mismatched kinds are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Ascending sort order over any pair of values.
///
/// This is a total order: absent values come first, then values ranked by
/// kind (null, boolean, number, RFC 3339 string, other string, array,
/// object) and compared within their kind.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => sort_key(x).cmp(&sort_key(y)),
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue<'a> {
    Null,
    Bool(bool),
    Number(TotalF64),
    Date(chrono::DateTime<chrono::FixedOffset>, &'a str),
    Text(&'a str),
    Array(String),
    Object(String),
}

#[derive(Debug, Clone, Copy)]
struct TotalF64(f64);

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn sort_key(value: &Value) -> SortValue<'_> {
    match value {
        Value::Null => SortValue::Null,
        Value::Bool(b) => SortValue::Bool(*b),
        Value::Number(n) => SortValue::Number(TotalF64(n.as_f64().unwrap_or(f64::NAN))),
        Value::String(s) => match chrono::DateTime::parse_from_rfc3339(s) {
            Ok(dt) => SortValue::Date(dt, s),
            Err(_) => SortValue::Text(s),
        },
        Value::Array(_) => SortValue::Array(value.to_string()),
        Value::Object(_) => SortValue::Object(value.to_string()),
    }
}

/// 1-based pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: i64, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Number of pages needed for `total` items
    pub fn page_count(&self, total: usize) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        total.div_ceil(self.page_size)
    }

    /// The effective 1-based page.
    ///
    /// Page 0 is treated as page 1; negative pages count from the end
    /// (`-1` is the last page).
    pub fn effective_page(&self, total: usize) -> usize {
        match self.page {
            p if p > 0 => p as usize,
            0 => 1,
            p => {
                let count = self.page_count(total) as i64;
                (count + p + 1).max(1) as usize
            }
        }
    }

    /// Index range of the requested page within `total` items
    pub fn bounds(&self, total: usize) -> std::ops::Range<usize> {
        let page = self.effective_page(total);
        let start = (page - 1).saturating_mul(self.page_size).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        start..end
    }
}

/// Outcome of [`Query::or`]; hand it back to [`Query::parent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Bracket {
    /// A new OR group was opened and must be closed
    Opened,
    /// The current group already was an OR group and is reused
    Joined,
}

/// A search against the store
#[derive(Debug, Clone)]
pub struct Query {
    /// Target type (all types when `None`)
    pub entity_type: Option<String>,

    /// Whether subtypes of `entity_type` match
    pub include_subtypes: bool,

    /// Ordering clauses, applied in sequence
    pub sort: Vec<SortOrder>,

    /// Pagination
    pub page: Option<PageRequest>,

    root: QueryGroup,
    open: Vec<QueryGroup>,
}

impl Query {
    /// Search every entity
    pub fn all() -> Self {
        Self {
            entity_type: None,
            include_subtypes: false,
            sort: Vec::new(),
            page: None,
            root: QueryGroup::new(Operation::And),
            open: Vec::new(),
        }
    }

    /// Search a single type, optionally including subtypes
    pub fn for_type(entity_type: impl Into<String>, include_subtypes: bool) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            include_subtypes,
            ..Self::all()
        }
    }

    fn current_mut(&mut self) -> &mut QueryGroup {
        match self.open.last_mut() {
            Some(group) => group,
            None => &mut self.root,
        }
    }

    /// Operation of the innermost open group
    pub fn current_operation(&self) -> Operation {
        self.open
            .last()
            .map(|g| g.operation)
            .unwrap_or(self.root.operation)
    }

    /// Add a leaf to the innermost open group
    pub fn attribute(&mut self, attribute: SearchAttribute) -> &mut Self {
        self.current_mut().add_attribute(attribute);
        self
    }

    /// Append a pre-built subtree to the innermost open group (pruned if empty)
    pub fn group(&mut self, group: QueryGroup) -> bool {
        self.current_mut().add_group(group)
    }

    /// Open an isolated group
    pub fn begin(&mut self, operation: Operation) {
        self.open.push(QueryGroup::new(operation));
    }

    /// Close the innermost isolated group, appending it only if non-empty.
    ///
    /// Returns whether anything was appended.
    pub fn end(&mut self) -> bool {
        match self.open.pop() {
            Some(group) => self.current_mut().add_group(group),
            None => false,
        }
    }

    /// Bracket an OR sequence into the attribute stream.
    ///
    /// If the innermost open group already is an OR group the stream joins
    /// it; otherwise a new OR group is opened.
    pub fn or(&mut self) -> Bracket {
        if !self.open.is_empty() && self.current_operation() == Operation::Or {
            Bracket::Joined
        } else {
            self.begin(Operation::Or);
            Bracket::Opened
        }
    }

    /// Close a bracket returned by [`Query::or`]
    pub fn parent(&mut self, bracket: Bracket) {
        if bracket == Bracket::Opened {
            self.end();
        }
    }

    pub fn sort_by(&mut self, order: SortOrder) -> &mut Self {
        self.sort.push(order);
        self
    }

    pub fn paginate(&mut self, page: PageRequest) -> &mut Self {
        self.page = Some(page);
        self
    }

    /// True when every opened group was closed
    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    /// Close any groups left open
    pub fn close_all(&mut self) {
        while !self.open.is_empty() {
            self.end();
        }
    }

    /// The root filter (an AND group)
    pub fn filter(&self) -> &QueryGroup {
        &self.root
    }
}
