//! graphpath Graph - Graph store implementations
//!
//! Provides the in-memory reference implementation of
//! [`graphpath_core::GraphStore`]: node and relationship CRUD, attribute-tree
//! search with sorting and paging, and bounded frontier-expansion traversal.
//! Graphs can be seeded from JSON fixtures.

pub mod fixture;
pub mod matcher;
pub mod memory;

pub use fixture::{load_fixture, Fixture, FixtureNode, FixtureRelationship};
pub use memory::MemoryGraphStore;
