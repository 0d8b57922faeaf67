//! graphpath Resource - Resource chain resolution
//!
//! Turns a REST path such as `/Person/<id>/Company/<id>/City` into a
//! [`Resource`] by recognising each segment and folding the sequence
//! left to right through a closed combination table. The resolved resource
//! answers GET/HEAD/POST/PUT/DELETE/OPTIONS against a [`GraphStore`].
//!
//! ```ignore
//! let ctx = RequestContext::new(store, schema, EngineConfig::default())
//!     .with_params(vec![("sort".into(), "name".into())]);
//! let resource = resolve("/Person/42/Company", &ctx)?;
//! let companies = resource.get(&ctx).await?;
//! ```
//!
//! [`GraphStore`]: graphpath_core::GraphStore

pub mod access;
pub mod admin;
pub mod combine;
pub mod context;
pub mod entity;
pub mod recognize;
pub mod relationship;
pub mod resolver;
pub mod resource;
pub mod result;
pub mod signature;
pub mod validator;
pub mod wrappers;

pub use access::AccessRules;
pub use context::{Principal, RequestContext};
pub use entity::Reference;
pub use recognize::{recognize, Segment, Token};
pub use resolver::{execute, resolve, resolve_segments, Outcome};
pub use resource::{Resource, ResourceKind, RestResource, Verb};
pub use result::{HeadResult, PageInfo, ResourceResult};
pub use signature::{resource_signature, signature_of};
pub use validator::{RelationshipPathValidator, ValidatedPath};
