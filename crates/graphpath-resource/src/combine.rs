//! Combination of a resolved resource with the next segment
//!
//! The table is closed: any pair not listed here is an illegal path.

use crate::admin::SchemaResource;
use crate::entity::{Reference, TypeResource, TypedIdResource};
use crate::recognize::{Segment, Token};
use crate::relationship::{
    RelationshipFollowingResource, RelationshipNodeResource, RelationshipResource,
    StaticRelationshipResource,
};
use crate::resource::{Resource, ResourceKind, RestResource};
use crate::validator::RelationshipPathValidator;
use crate::wrappers::{IdsOnlyResource, PagingResource, SortResource, ViewFilterResource};
use graphpath_core::{GraphPathError, Result, Schema, SortOrder, TypeMatch};

fn illegal(left: ResourceKind, right: ResourceKind) -> GraphPathError {
    GraphPathError::illegal_path(format!("{left} cannot be followed by {right}"))
}

fn reference(token: &Token) -> Option<Reference> {
    match token {
        Token::Uuid(uuid) => Some(Reference::Uuid(*uuid)),
        Token::Id(id) => Some(Reference::NodeId(*id)),
        _ => None,
    }
}

/// Fold `right` into `left`
pub fn combine(schema: &Schema, left: Resource, right: Segment) -> Result<Resource> {
    let (left_kind, right_kind) = (left.kind(), right.kind());
    let text = right.text.as_str();

    if left_kind.is_wrapper() {
        return Err(illegal(left_kind, right_kind));
    }

    let combined = match (left, &right.token) {
        (Resource::Type(ty), Token::Uuid(_) | Token::Id(_)) => {
            let reference = reference(&right.token).ok_or_else(|| illegal(left_kind, right_kind))?;
            Resource::TypedId(TypedIdResource::new(&ty, reference, text))
        }

        (Resource::TypedId(typed), Token::Type(m)) => {
            let anchor_type = typed.entity_type.clone();
            static_relationship(schema, Resource::TypedId(typed), &anchor_type, m, text)?
        }
        (Resource::RelationshipFollowing(following), Token::Type(m)) => {
            let anchor_type = following
                .validator()
                .last()
                .map(|last| last.entity_type.clone())
                .ok_or_else(|| illegal(left_kind, right_kind))?;
            static_relationship(
                schema,
                Resource::RelationshipFollowing(following),
                &anchor_type,
                m,
                text,
            )?
        }

        (Resource::StaticRelationship(stat), Token::Uuid(_) | Token::Id(_)) => {
            let reference = reference(&right.token).ok_or_else(|| illegal(left_kind, right_kind))?;
            let (anchor, target) = stat.into_parts();
            let typed = TypedIdResource::new(&target, reference, text);
            follow(schema, anchor, typed)?
        }

        (
            left @ (Resource::Uuid(_)
            | Resource::Id(_)
            | Resource::TypedId(_)
            | Resource::RelationshipFollowing(_)),
            Token::Relationship(direction),
        ) => Resource::Relationship(RelationshipResource::new(*direction, left, text)),

        (left @ Resource::Relationship(_), Token::RelationshipNode(end)) => {
            Resource::RelationshipNode(RelationshipNodeResource::new(*end, left, text))
        }

        (Resource::NamedRelation(named), Token::Uuid(_) | Token::Id(_))
            if named.bound.is_none() =>
        {
            let reference = reference(&right.token).ok_or_else(|| illegal(left_kind, right_kind))?;
            Resource::NamedRelation(named.bind(reference, text))
        }
        (Resource::NamedRelation(named), Token::RelationshipNode(end))
            if named.bound.is_some() =>
        {
            Resource::RelationshipNode(RelationshipNodeResource::new(
                *end,
                Resource::NamedRelation(named),
                text,
            ))
        }

        (Resource::Maintenance(maintenance), Token::Maintenance(Some(command)))
            if maintenance.command.is_none() =>
        {
            Resource::Maintenance(maintenance.with_command(*command, text))
        }

        (Resource::Schema(schema_resource), Token::Type(m))
            if schema_resource.entity_type.is_none() =>
        {
            let ty = TypeResource::new(m.name.clone(), m.inheriting, text);
            Resource::Schema(SchemaResource::for_type(schema_resource, &ty))
        }

        (left, Token::View(view)) => {
            Resource::ViewFilter(ViewFilterResource::new(left, view.clone(), text))
        }
        (left, Token::IdsOnly) => Resource::IdsOnly(IdsOnlyResource::new(left, text)),

        _ => return Err(illegal(left_kind, right_kind)),
    };

    Ok(combined)
}

/// `TypedId`/`RelationshipFollowing` followed by a type name
fn static_relationship(
    schema: &Schema,
    anchor: Resource,
    anchor_type: &str,
    target: &TypeMatch,
    text: &str,
) -> Result<Resource> {
    let target = TypeResource::new(target.name.clone(), target.inheriting, text);
    let declared = schema
        .declared_relationship(anchor_type, &target.name)
        .ok_or_else(|| {
            GraphPathError::illegal_path(format!(
                "No relationship declared between {anchor_type} and {}",
                target.name
            ))
        })?;
    let (rel_type, direction) = (declared.rel_type.to_string(), declared.direction);
    Ok(Resource::StaticRelationship(StaticRelationshipResource::new(
        anchor, target, &rel_type, direction,
    )))
}

/// Join an anchor and a typed id into a relationship path
fn follow(schema: &Schema, anchor: Resource, next: TypedIdResource) -> Result<Resource> {
    match anchor {
        Resource::TypedId(first) => {
            let uri_part = format!("{}/{}", first.uri_part(), next.uri_part());
            let validator = RelationshipPathValidator::new(schema, first, next)?;
            Ok(Resource::RelationshipFollowing(
                RelationshipFollowingResource::new(validator, uri_part),
            ))
        }
        Resource::RelationshipFollowing(mut following) => {
            following.push(schema, next)?;
            Ok(Resource::RelationshipFollowing(following))
        }
        other => Err(illegal(other.kind(), ResourceKind::TypedId)),
    }
}

/// Wrap in a sort clause; nothing may follow paging
pub fn with_sort(left: Resource, keys: Vec<SortOrder>) -> Result<Resource> {
    match left.kind() {
        ResourceKind::Paging => Err(illegal(ResourceKind::Paging, ResourceKind::Sort)),
        _ => Ok(Resource::Sort(SortResource::new(left, keys))),
    }
}

/// Wrap in a paging clause
pub fn with_paging(left: Resource, page: i64, page_size: usize) -> Result<Resource> {
    match left.kind() {
        ResourceKind::Paging => Err(illegal(ResourceKind::Paging, ResourceKind::Paging)),
        _ => Ok(Resource::Paging(PagingResource::new(left, page, page_size))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognize::recognize;
    use uuid::Uuid;

    fn schema() -> Schema {
        Schema::from_toml_str(
            r#"
            [[type]]
            name = "Person"
            views = { public = [] }

            [[type]]
            name = "Company"

            [[type]]
            name = "City"

            [[relationship]]
            rel_type = "WORKS_AT"
            source = "Person"
            target = "Company"

            [[relationship]]
            rel_type = "LOCATED_IN"
            source = "Company"
            target = "City"
            "#,
        )
        .unwrap()
    }

    fn fold(path: &str) -> Result<Resource> {
        let schema = schema();
        let mut segments = path.split('/').map(|s| recognize(&schema, s));
        let first = segments.next().unwrap()?.into_resource()?;
        segments.try_fold(first, |left, segment| combine(&schema, left, segment?))
    }

    #[test]
    fn test_typed_id_and_static_relationship() {
        let id = Uuid::new_v4();
        assert_eq!(fold(&format!("Person/{id}")).unwrap().kind(), ResourceKind::TypedId);
        assert_eq!(
            fold(&format!("Person/{id}/Company")).unwrap().kind(),
            ResourceKind::StaticRelationship
        );
        assert_eq!(
            fold(&format!("Person/{id}/Company/7")).unwrap().kind(),
            ResourceKind::RelationshipFollowing
        );
        assert_eq!(
            fold(&format!("Person/{id}/Company/7/City/8")).unwrap().kind(),
            ResourceKind::RelationshipFollowing
        );
    }

    #[test]
    fn test_illegal_pairs() {
        let id = Uuid::new_v4();
        for path in [
            "Person/Company".to_string(),
            format!("Person/{id}/City"),
            "Person/out".to_string(),
            "maintenance/maintenance".to_string(),
            format!("Person/{id}/ids/public"),
        ] {
            let err = fold(&path).unwrap_err();
            assert!(matches!(err, GraphPathError::IllegalPath(_)), "{path}");
        }
    }

    #[test]
    fn test_repeated_reference_is_illegal() {
        let id = Uuid::new_v4();
        let err = fold(&format!("Person/{id}/Company/{id}")).unwrap_err();
        assert!(matches!(err, GraphPathError::IllegalPath(_)));
    }

    #[test]
    fn test_relationship_wrappers() {
        let id = Uuid::new_v4();
        let resource = fold(&format!("{id}/out/end")).unwrap();
        assert_eq!(resource.kind(), ResourceKind::RelationshipNode);
        assert!(resource.is_collection());

        let bound = fold(&format!("WORKS_AT/{id}/start")).unwrap();
        assert_eq!(bound.kind(), ResourceKind::RelationshipNode);
        assert!(!bound.is_collection());

        let err = fold("WORKS_AT/start").unwrap_err();
        assert!(matches!(err, GraphPathError::IllegalPath(_)));
    }

    #[test]
    fn test_paging_is_last() {
        let paged = with_paging(fold("persons").unwrap(), 1, 10).unwrap();
        assert!(with_sort(paged.clone(), Vec::new()).is_err());
        assert!(with_paging(paged, 2, 10).is_err());
    }
}
