//! Relationship path validation
//!
//! A chain such as `Person/<a>/Company/<b>/City/<c>` claims that `a`, `b`
//! and `c` are connected along the relationships declared between their
//! types. The validator proves it with one bounded traversal:
//!
//! - expansion follows only the declared relationships collected so far
//! - a node is visited at most once across the whole traversal
//! - a path is kept only if it has exactly one hop per pair and starts and
//!   ends at the first and last entity

use crate::context::RequestContext;
use crate::entity::TypedIdResource;
use graphpath_core::{
    Entity, Evaluation, GraphPath, GraphPathError, RelationshipSpec, Result, Schema,
    TraversalDescription, Uniqueness,
};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Accumulated `(reference, type)` chain and the relationships it may use
#[derive(Debug, Clone)]
pub struct RelationshipPathValidator {
    entries: Vec<TypedIdResource>,
    specs: Vec<RelationshipSpec>,
    /// Type pairs whose declaration is already part of `specs`
    declared: HashSet<(String, String)>,
}

/// A proven path with its nodes loaded
#[derive(Debug, Clone)]
pub struct ValidatedPath {
    pub path: GraphPath,
    pub nodes: Vec<Entity>,
}

impl RelationshipPathValidator {
    /// Seed the chain with its first two entities
    pub fn new(schema: &Schema, first: TypedIdResource, second: TypedIdResource) -> Result<Self> {
        let mut validator = Self {
            entries: vec![first],
            specs: Vec::new(),
            declared: HashSet::new(),
        };
        validator.push(schema, second)?;
        Ok(validator)
    }

    /// Append an entity.
    ///
    /// Fails right away when the reference repeats or no relationship is
    /// declared between the previous type and this one.
    pub fn push(&mut self, schema: &Schema, next: TypedIdResource) -> Result<()> {
        if self.entries.iter().any(|e| e.reference == next.reference) {
            return Err(GraphPathError::illegal_path(format!(
                "{} appears twice in the path",
                next.reference
            )));
        }

        let Some(previous) = self.entries.last() else {
            self.entries.push(next);
            return Ok(());
        };

        let declared = schema
            .declared_relationship(&previous.entity_type, &next.entity_type)
            .ok_or_else(|| {
                GraphPathError::illegal_path(format!(
                    "No relationship declared between {} and {}",
                    previous.entity_type, next.entity_type
                ))
            })?;

        let pair = (previous.entity_type.clone(), next.entity_type.clone());
        if self.declared.insert(pair) {
            let spec = RelationshipSpec::new(declared.rel_type, declared.direction);
            if !self.specs.contains(&spec) {
                self.specs.push(spec);
            }
        }

        self.entries.push(next);
        Ok(())
    }

    pub fn entries(&self) -> &[TypedIdResource] {
        &self.entries
    }

    pub fn specs(&self) -> &[RelationshipSpec] {
        &self.specs
    }

    /// Number of hops the path must have
    pub fn target_length(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// The entity the chain ends at
    pub fn last(&self) -> Option<&TypedIdResource> {
        self.entries.last()
    }

    /// Prove the path exists and load every node on it
    pub async fn validate(&self, ctx: &RequestContext) -> Result<ValidatedPath> {
        let mut endpoints = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            endpoints.push(entry.load(ctx).await?);
        }

        let identifiers: HashSet<Uuid> = endpoints.iter().map(|e| e.uuid).collect();
        if identifiers.len() != endpoints.len() {
            // Same node named once by reference and once by numeric id
            return Err(GraphPathError::illegal_path("The same entity appears twice in the path"));
        }

        let (Some(first), Some(last)) = (endpoints.first(), endpoints.last()) else {
            return Err(GraphPathError::illegal_path("Empty relationship path"));
        };
        let (start, end) = (first.uuid, last.uuid);
        let target = self.target_length();

        let evaluator = move |path: &GraphPath| {
            let length = path.length();
            if length == 0 {
                Evaluation::ExcludeAndContinue
            } else if !identifiers.contains(&path.end()) {
                Evaluation::ExcludeAndPrune
            } else if length == target {
                Evaluation::IncludeAndPrune
            } else if length < target {
                Evaluation::IncludeAndContinue
            } else {
                Evaluation::ExcludeAndPrune
            }
        };

        let description = self
            .specs
            .iter()
            .cloned()
            .fold(TraversalDescription::depth_first(), TraversalDescription::relationship)
            .uniqueness(Uniqueness::NodeGlobal)
            .max_expanded(ctx.engine.traversal_node_limit);

        let paths = ctx.store.traverse(start, &description, &evaluator).await?;

        let mut by_length: BTreeMap<usize, Vec<GraphPath>> = BTreeMap::new();
        for path in paths {
            by_length.entry(path.length()).or_default().push(path);
        }
        debug!(
            start = %start,
            end = %end,
            target,
            lengths = ?by_length.keys().collect::<Vec<_>>(),
            "Relationship path traversal finished"
        );

        let path = by_length
            .remove(&target)
            .and_then(|candidates| {
                candidates
                    .into_iter()
                    .find(|p| p.start() == start && p.end() == end)
            })
            .ok_or_else(|| {
                GraphPathError::not_found(format!(
                    "No relationship path of length {target} from {start} to {end}"
                ))
            })?;

        let mut nodes = Vec::with_capacity(path.nodes.len());
        for uuid in &path.nodes {
            let node = ctx
                .store
                .find_by_uuid(*uuid)
                .await?
                .ok_or_else(|| GraphPathError::not_found(format!("Node {uuid}")))?;
            nodes.push(node);
        }

        Ok(ValidatedPath { path, nodes })
    }
}
