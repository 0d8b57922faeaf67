//! Segment recognition
//!
//! Each path segment is matched against the segment forms in a fixed
//! priority order; the first match wins.

use crate::admin::{CypherResource, MaintenanceResource, SchemaResource};
use crate::entity::{IdResource, TypeResource, UuidResource};
use crate::relationship::{NamedRelationResource, NodeEnd};
use crate::resource::{Resource, ResourceKind};
use graphpath_core::{
    is_numeric_id, parse_entity_reference, Direction, GraphPathError, MaintenanceCommand, Result,
    Schema, TypeMatch,
};
use uuid::Uuid;

pub const MAINTENANCE_SEGMENT: &str = "maintenance";
pub const SCHEMA_SEGMENT: &str = "_schema";
pub const CYPHER_SEGMENT: &str = "cypher";
pub const IDS_SEGMENT: &str = "ids";

/// What a single segment was recognised as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uuid(Uuid),
    Id(u64),
    Relationship(Direction),
    RelationshipNode(NodeEnd),
    IdsOnly,
    Maintenance(Option<MaintenanceCommand>),
    Schema,
    Cypher,
    NamedRelation(String),
    Type(TypeMatch),
    View(String),
}

/// A recognised path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub token: Token,
}

impl Segment {
    pub fn kind(&self) -> ResourceKind {
        match &self.token {
            Token::Uuid(_) => ResourceKind::Uuid,
            Token::Id(_) => ResourceKind::Id,
            Token::Relationship(_) => ResourceKind::Relationship,
            Token::RelationshipNode(_) => ResourceKind::RelationshipNode,
            Token::IdsOnly => ResourceKind::IdsOnly,
            Token::Maintenance(_) => ResourceKind::Maintenance,
            Token::Schema => ResourceKind::Schema,
            Token::Cypher => ResourceKind::Cypher,
            Token::NamedRelation(_) => ResourceKind::NamedRelation,
            Token::Type(m) if m.inheriting => ResourceKind::InheritingType,
            Token::Type(_) => ResourceKind::Type,
            Token::View(_) => ResourceKind::ViewFilter,
        }
    }

    /// The resource this segment stands for at the start of a path.
    ///
    /// Segments that only modify what precedes them have none.
    pub fn into_resource(self) -> Result<Resource> {
        let text = self.text.as_str();
        let resource = match self.token {
            Token::Uuid(uuid) => Resource::Uuid(UuidResource::new(uuid, text)),
            Token::Id(id) => Resource::Id(IdResource::new(id, text)),
            Token::Maintenance(command) => {
                Resource::Maintenance(MaintenanceResource::new(command, text))
            }
            Token::Schema => Resource::Schema(SchemaResource::new(text)),
            Token::Cypher => Resource::Cypher(CypherResource::new(text)),
            Token::NamedRelation(rel_type) => {
                Resource::NamedRelation(NamedRelationResource::new(rel_type, text))
            }
            Token::Type(m) => Resource::Type(TypeResource::new(m.name, m.inheriting, text)),
            Token::Relationship(_)
            | Token::RelationshipNode(_)
            | Token::IdsOnly
            | Token::View(_) => {
                return Err(GraphPathError::illegal_path(format!(
                    "{text} cannot start a path"
                )))
            }
        };
        Ok(resource)
    }
}

/// Recognise one segment
pub fn recognize(schema: &Schema, segment: &str) -> Result<Segment> {
    let token = if let Some(uuid) = parse_entity_reference(segment) {
        Token::Uuid(uuid)
    } else if let Some(id) = is_numeric_id(segment)
        .then(|| segment.parse::<u64>().ok())
        .flatten()
    {
        Token::Id(id)
    } else if let Some(direction) = relationship_direction(segment) {
        Token::Relationship(direction)
    } else if let Some(end) = NodeEnd::from_segment(segment) {
        Token::RelationshipNode(end)
    } else if segment == IDS_SEGMENT {
        Token::IdsOnly
    } else if segment == MAINTENANCE_SEGMENT {
        Token::Maintenance(None)
    } else if let Some(command) = MaintenanceCommand::from_segment(segment) {
        Token::Maintenance(Some(command))
    } else if segment == SCHEMA_SEGMENT {
        Token::Schema
    } else if segment == CYPHER_SEGMENT {
        Token::Cypher
    } else if schema.relationship_type(segment).is_some() {
        Token::NamedRelation(segment.to_string())
    } else if let Some(m) = schema.resolve_type_segment(segment) {
        Token::Type(m)
    } else if schema.view_names().contains(segment) {
        Token::View(segment.to_string())
    } else {
        return Err(GraphPathError::not_found(format!("Resource '{segment}'")));
    };

    Ok(Segment {
        text: segment.to_string(),
        token,
    })
}

fn relationship_direction(segment: &str) -> Option<Direction> {
    match segment {
        "in" => Some(Direction::Incoming),
        "out" => Some(Direction::Outgoing),
        "all" => Some(Direction::Both),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_toml_str(
            r#"
            [[type]]
            name = "Person"
            properties = { name = "string" }
            views = { public = ["name"] }

            [[type]]
            name = "Company"

            [[relationship]]
            rel_type = "WORKS_AT"
            source = "Person"
            target = "Company"
            "#,
        )
        .unwrap()
    }

    fn kind(segment: &str) -> ResourceKind {
        recognize(&schema(), segment).unwrap().kind()
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(kind(&Uuid::new_v4().to_string()), ResourceKind::Uuid);
        assert_eq!(kind("42"), ResourceKind::Id);
        assert_eq!(kind("out"), ResourceKind::Relationship);
        assert_eq!(kind("end"), ResourceKind::RelationshipNode);
        assert_eq!(kind("ids"), ResourceKind::IdsOnly);
        assert_eq!(kind("maintenance"), ResourceKind::Maintenance);
        assert_eq!(kind("rebuildIndex"), ResourceKind::Maintenance);
        assert_eq!(kind("_schema"), ResourceKind::Schema);
        assert_eq!(kind("cypher"), ResourceKind::Cypher);
        assert_eq!(kind("WORKS_AT"), ResourceKind::NamedRelation);
        assert_eq!(kind("Person"), ResourceKind::InheritingType);
        assert_eq!(kind("persons"), ResourceKind::Type);
        assert_eq!(kind("company"), ResourceKind::Type);
        assert_eq!(kind("public"), ResourceKind::ViewFilter);
    }

    #[test]
    fn test_unknown_segment_is_not_found() {
        let err = recognize(&schema(), "unicorns").unwrap_err();
        assert!(matches!(err, GraphPathError::NotFound(_)));
    }

    #[test]
    fn test_modifiers_cannot_start_a_path() {
        for segment in ["out", "start", "ids", "public"] {
            let err = recognize(&schema(), segment)
                .unwrap()
                .into_resource()
                .unwrap_err();
            assert!(matches!(err, GraphPathError::IllegalPath(_)), "{segment}");
        }
    }
}
