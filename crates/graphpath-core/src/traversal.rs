//! Graph traversal primitives
//!
//! A [`TraversalDescription`] says which relationships to expand, in which
//! order and under which uniqueness rule. A [`PathEvaluator`] decides for
//! every reached path whether it belongs to the result and whether to keep
//! expanding it. [`expand`] is the frontier loop that store backends drive
//! with their own neighbour lookup.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Direction of a relationship as seen from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Outgoing => Self::Incoming,
            Self::Incoming => Self::Outgoing,
            Self::Both => Self::Both,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outgoing => "out",
            Self::Incoming => "in",
            Self::Both => "all",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One relationship type to expand along
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub rel_type: String,
    pub direction: Direction,
}

impl RelationshipSpec {
    pub fn new(rel_type: impl Into<String>, direction: Direction) -> Self {
        Self {
            rel_type: rel_type.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalOrder {
    DepthFirst,
    BreadthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uniqueness {
    /// A node is visited at most once across the whole traversal
    NodeGlobal,
    /// A node appears at most once within one path
    NodePath,
}

/// What to expand and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalDescription {
    pub order: TraversalOrder,
    pub uniqueness: Uniqueness,
    pub relationships: Vec<RelationshipSpec>,
    /// Upper bound on expanded nodes; the traversal stops early once reached
    pub max_expanded: Option<usize>,
}

impl Default for TraversalDescription {
    fn default() -> Self {
        Self {
            order: TraversalOrder::DepthFirst,
            uniqueness: Uniqueness::NodeGlobal,
            relationships: Vec::new(),
            max_expanded: None,
        }
    }
}

impl TraversalDescription {
    pub fn depth_first() -> Self {
        Self::default()
    }

    pub fn breadth_first() -> Self {
        Self {
            order: TraversalOrder::BreadthFirst,
            ..Self::default()
        }
    }

    pub fn uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    /// Expand along `spec` as well (duplicates are ignored)
    pub fn relationship(mut self, spec: RelationshipSpec) -> Self {
        if !self.relationships.contains(&spec) {
            self.relationships.push(spec);
        }
        self
    }

    pub fn max_expanded(mut self, limit: Option<usize>) -> Self {
        self.max_expanded = limit;
        self
    }
}

/// A path from a start node, alternating nodes and relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<Uuid>,
    pub relationships: Vec<Uuid>,
}

impl GraphPath {
    /// The zero-length path at `node`
    pub fn start_at(node: Uuid) -> Self {
        Self {
            nodes: vec![node],
            relationships: Vec::new(),
        }
    }

    pub fn start(&self) -> Uuid {
        self.nodes[0]
    }

    pub fn end(&self) -> Uuid {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of relationships in the path
    pub fn length(&self) -> usize {
        self.relationships.len()
    }

    pub fn contains_node(&self, node: Uuid) -> bool {
        self.nodes.contains(&node)
    }

    /// A new path one hop longer
    pub fn extend(&self, relationship: Uuid, node: Uuid) -> Self {
        let mut next = self.clone();
        next.relationships.push(relationship);
        next.nodes.push(node);
        next
    }
}

/// Decision taken for one reached path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    IncludeAndContinue,
    IncludeAndPrune,
    ExcludeAndContinue,
    ExcludeAndPrune,
}

impl Evaluation {
    pub fn includes(self) -> bool {
        matches!(self, Self::IncludeAndContinue | Self::IncludeAndPrune)
    }

    pub fn continues(self) -> bool {
        matches!(self, Self::IncludeAndContinue | Self::ExcludeAndContinue)
    }
}

/// Accept/continue/prune decision injected into a traversal
pub trait PathEvaluator: Send + Sync {
    fn evaluate(&self, path: &GraphPath) -> Evaluation;
}

impl<F> PathEvaluator for F
where
    F: Fn(&GraphPath) -> Evaluation + Send + Sync,
{
    fn evaluate(&self, path: &GraphPath) -> Evaluation {
        self(path)
    }
}

/// Result of a frontier expansion
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    pub paths: Vec<GraphPath>,
    pub expanded: usize,
    /// The expansion limit was hit before the frontier was exhausted
    pub truncated: bool,
}

/// Run a traversal from `start`.
///
/// `neighbors(node, spec)` returns `(relationship, other node)` pairs for
/// every relationship of `spec` touching `node`.
pub fn expand<N>(
    description: &TraversalDescription,
    start: Uuid,
    evaluator: &dyn PathEvaluator,
    mut neighbors: N,
) -> TraversalOutcome
where
    N: FnMut(Uuid, &RelationshipSpec) -> Vec<(Uuid, Uuid)>,
{
    let mut outcome = TraversalOutcome::default();
    let mut frontier = VecDeque::from([GraphPath::start_at(start)]);
    let mut visited = HashSet::from([start]);

    loop {
        let next = match description.order {
            TraversalOrder::DepthFirst => frontier.pop_back(),
            TraversalOrder::BreadthFirst => frontier.pop_front(),
        };
        let Some(path) = next else { break };

        let evaluation = evaluator.evaluate(&path);
        if evaluation.includes() {
            outcome.paths.push(path.clone());
        }
        if !evaluation.continues() {
            continue;
        }

        if let Some(limit) = description.max_expanded {
            if outcome.expanded >= limit {
                outcome.truncated = true;
                break;
            }
        }
        outcome.expanded += 1;

        let end = path.end();
        let mut children = Vec::new();
        for spec in &description.relationships {
            for (relationship, node) in neighbors(end, spec) {
                let fresh = match description.uniqueness {
                    Uniqueness::NodeGlobal => visited.insert(node),
                    Uniqueness::NodePath => !path.contains_node(node),
                };
                if fresh {
                    children.push(path.extend(relationship, node));
                }
            }
        }

        match description.order {
            // Reversed so the first neighbour is expanded first
            TraversalOrder::DepthFirst => frontier.extend(children.into_iter().rev()),
            TraversalOrder::BreadthFirst => frontier.extend(children),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Tiny adjacency list: node -> [(rel, node)] for one relationship type
    struct Fixture {
        nodes: Vec<Uuid>,
        edges: HashMap<Uuid, Vec<(Uuid, Uuid)>>,
    }

    impl Fixture {
        fn chain(len: usize) -> Self {
            let nodes: Vec<Uuid> = (0..len).map(|_| Uuid::new_v4()).collect();
            let mut edges: HashMap<Uuid, Vec<(Uuid, Uuid)>> = HashMap::new();
            for pair in nodes.windows(2) {
                edges
                    .entry(pair[0])
                    .or_default()
                    .push((Uuid::new_v4(), pair[1]));
            }
            Self { nodes, edges }
        }

        fn neighbors(&self, node: Uuid) -> Vec<(Uuid, Uuid)> {
            self.edges.get(&node).cloned().unwrap_or_default()
        }
    }

    fn description() -> TraversalDescription {
        TraversalDescription::depth_first()
            .relationship(RelationshipSpec::new("NEXT", Direction::Outgoing))
    }

    #[test]
    fn test_expand_collects_included_paths() {
        let fixture = Fixture::chain(4);
        let evaluator = |path: &GraphPath| {
            if path.length() == 2 {
                Evaluation::IncludeAndPrune
            } else {
                Evaluation::ExcludeAndContinue
            }
        };

        let outcome = expand(&description(), fixture.nodes[0], &evaluator, |node, _| {
            fixture.neighbors(node)
        });

        assert_eq!(outcome.paths.len(), 1);
        assert_eq!(outcome.paths[0].end(), fixture.nodes[2]);
        assert_eq!(outcome.paths[0].start(), fixture.nodes[0]);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_prune_stops_expansion() {
        let fixture = Fixture::chain(5);
        let evaluator = |_: &GraphPath| Evaluation::IncludeAndPrune;

        let outcome = expand(&description(), fixture.nodes[0], &evaluator, |node, _| {
            fixture.neighbors(node)
        });

        // Only the start path; nothing is expanded
        assert_eq!(outcome.paths.len(), 1);
        assert_eq!(outcome.expanded, 0);
    }

    #[test]
    fn test_node_global_uniqueness_on_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edges = HashMap::from([(a, vec![(Uuid::new_v4(), b)]), (b, vec![(Uuid::new_v4(), a)])]);
        let evaluator = |_: &GraphPath| Evaluation::IncludeAndContinue;

        let outcome = expand(&description(), a, &evaluator, |node, _| {
            edges.get(&node).cloned().unwrap_or_default()
        });

        assert_eq!(outcome.paths.len(), 2);
    }

    #[test]
    fn test_expansion_limit_truncates() {
        let fixture = Fixture::chain(10);
        let evaluator = |_: &GraphPath| Evaluation::ExcludeAndContinue;

        let outcome = expand(
            &description().max_expanded(Some(3)),
            fixture.nodes[0],
            &evaluator,
            |node, _| fixture.neighbors(node),
        );

        assert!(outcome.truncated);
        assert_eq!(outcome.expanded, 3);
    }

    #[test]
    fn test_duplicate_relationship_specs_ignored() {
        let description = description()
            .relationship(RelationshipSpec::new("NEXT", Direction::Outgoing))
            .relationship(RelationshipSpec::new("NEXT", Direction::Incoming));
        assert_eq!(description.relationships.len(), 2);
    }

    #[test]
    fn test_direction_reverse() {
        assert_eq!(Direction::Outgoing.reverse(), Direction::Incoming);
        assert_eq!(Direction::Both.reverse(), Direction::Both);
        assert_eq!(Direction::Incoming.to_string(), "in");
    }
}
