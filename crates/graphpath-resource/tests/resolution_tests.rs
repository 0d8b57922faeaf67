//! End-to-end resolution tests against the in-memory store

use graphpath_core::{EngineConfig, Entity, GraphObject, GraphPathError, GraphStore, Schema};
use graphpath_graph::MemoryGraphStore;
use graphpath_resource::{
    execute, resolve, resource_signature, Outcome, RequestContext, ResourceKind, Verb,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

const SCHEMA: &str = r#"
    [[type]]
    name = "Person"
    properties = { name = "string", rank = "integer", team = "string", tag = "json" }
    views = { public = ["name"] }

    [[type]]
    name = "Employee"
    parent = "Person"
    properties = { salary = "float" }

    [[type]]
    name = "Company"
    properties = { name = "string" }

    [[type]]
    name = "City"
    properties = { name = "string" }

    [[relationship]]
    rel_type = "WORKS_AT"
    source = "Person"
    target = "Company"
    source_property = "employer"
    target_property = "staff"

    [[relationship]]
    rel_type = "LOCATED_IN"
    source = "Company"
    target = "City"
    source_property = "city"
"#;

struct Graph {
    store: Arc<MemoryGraphStore>,
    schema: Arc<Schema>,
    ada: Entity,
    acme: Entity,
    initech: Entity,
    london: Entity,
    paris: Entity,
}

impl Graph {
    fn ctx(&self, params: &[(&str, &str)]) -> RequestContext {
        RequestContext::new(self.store.clone(), self.schema.clone(), EngineConfig::default())
            .with_params(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<Value>, GraphPathError> {
        let ctx = self.ctx(params);
        let result = resolve(path, &ctx)?.get(&ctx).await?;
        Ok(result.items.iter().map(GraphObject::to_json).collect())
    }
}

async fn node(store: &MemoryGraphStore, ty: &str, props: Value) -> Entity {
    let properties = props
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    store.create_node(ty, properties).await.unwrap()
}

async fn link(store: &MemoryGraphStore, rel_type: &str, from: &Entity, to: &Entity) {
    store
        .create_relationship(rel_type, from.uuid, to.uuid, Default::default())
        .await
        .unwrap();
}

/// Ada -> Acme -> London, Paris unconnected, Initech -> Paris
async fn graph() -> Graph {
    let schema = Arc::new(Schema::from_toml_str(SCHEMA).unwrap());
    let store = Arc::new(MemoryGraphStore::new(schema.clone()));

    let ada = node(&store, "Person", json!({ "name": "Ada", "rank": 2 })).await;
    let acme = node(&store, "Company", json!({ "name": "Acme" })).await;
    let initech = node(&store, "Company", json!({ "name": "Initech" })).await;
    let london = node(&store, "City", json!({ "name": "London" })).await;
    let paris = node(&store, "City", json!({ "name": "Paris" })).await;

    link(&store, "WORKS_AT", &ada, &acme).await;
    link(&store, "LOCATED_IN", &acme, &london).await;
    link(&store, "LOCATED_IN", &initech, &paris).await;

    Graph {
        store,
        schema,
        ada,
        acme,
        initech,
        london,
        paris,
    }
}

fn names(items: &[Value]) -> Vec<&str> {
    items.iter().filter_map(|item| item["name"].as_str()).collect()
}

// ============================================================================
// Relationship paths
// ============================================================================

#[tokio::test]
async fn test_connected_path_returns_last_entity() {
    let g = graph().await;
    let path = format!(
        "/Person/{}/Company/{}/City/{}",
        g.ada.uuid, g.acme.uuid, g.london.uuid
    );
    let items = g.get(&path, &[]).await.unwrap();
    assert_eq!(names(&items), vec!["London"]);
}

#[tokio::test]
async fn test_numeric_ids_address_the_same_path() {
    let g = graph().await;
    let path = format!(
        "person/{}/company/{}/city/{}",
        g.ada.node_id, g.acme.node_id, g.london.node_id
    );
    let items = g.get(&path, &[]).await.unwrap();
    assert_eq!(names(&items), vec!["London"]);
}

#[tokio::test]
async fn test_disconnected_path_is_not_found() {
    let g = graph().await;
    let wrong_city = format!(
        "/Person/{}/Company/{}/City/{}",
        g.ada.uuid, g.acme.uuid, g.paris.uuid
    );
    assert!(matches!(
        g.get(&wrong_city, &[]).await.unwrap_err(),
        GraphPathError::NotFound(_)
    ));

    let wrong_company = format!("/Person/{}/Company/{}", g.ada.uuid, g.initech.uuid);
    assert!(matches!(
        g.get(&wrong_company, &[]).await.unwrap_err(),
        GraphPathError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_entity_named_twice_is_illegal() {
    let g = graph().await;
    let ctx = g.ctx(&[]);

    let same_reference = format!("/Person/{}/Company/{}", g.ada.uuid, g.ada.uuid);
    assert!(matches!(
        resolve(&same_reference, &ctx).unwrap_err(),
        GraphPathError::IllegalPath(_)
    ));

    // Different reference forms of one node are only caught at validation
    let mixed = format!(
        "/Person/{}/Company/{}/Person/{}",
        g.ada.uuid, g.acme.uuid, g.ada.node_id
    );
    let resource = resolve(&mixed, &ctx).unwrap();
    assert!(matches!(
        resource.get(&ctx).await.unwrap_err(),
        GraphPathError::IllegalPath(_)
    ));
}

#[tokio::test]
async fn test_illegal_combinations() {
    let g = graph().await;
    let ctx = g.ctx(&[]);
    for path in [
        "/Person/Company".to_string(),
        format!("/Person/{}/City", g.ada.uuid),
        format!("/Company/{}/{}", g.acme.uuid, g.london.uuid),
        "/maintenance/cypher".to_string(),
    ] {
        let err = resolve(&path, &ctx).unwrap_err();
        assert!(matches!(err, GraphPathError::IllegalPath(_)), "{path}: {err}");
    }
}

#[tokio::test]
async fn test_type_mismatch_is_not_found() {
    let g = graph().await;
    let err = g
        .get(&format!("/Company/{}", g.ada.uuid), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GraphPathError::NotFound(_)));
}

#[tokio::test]
async fn test_delegated_write_validates_first() {
    let g = graph().await;
    let ctx = g.ctx(&[]);

    let broken = format!("/Company/{}/City/{}", g.acme.uuid, g.paris.uuid);
    let err = resolve(&broken, &ctx)
        .unwrap()
        .put(&ctx, &json!({ "name": "Lutetia" }))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphPathError::NotFound(_)));
    assert_eq!(
        g.store.find_by_uuid(g.paris.uuid).await.unwrap().unwrap().properties["name"],
        json!("Paris")
    );

    let valid = format!("/Company/{}/City/{}", g.initech.uuid, g.paris.uuid);
    let updated = resolve(&valid, &ctx)
        .unwrap()
        .put(&ctx, &json!({ "name": "Lutetia" }))
        .await
        .unwrap();
    assert_eq!(updated.items[0].to_json()["name"], json!("Lutetia"));
}

// ============================================================================
// Static relationships and relationship segments
// ============================================================================

#[tokio::test]
async fn test_static_relationship_get_and_post() {
    let g = graph().await;
    let path = format!("/Person/{}/Company", g.ada.uuid);
    assert_eq!(names(&g.get(&path, &[]).await.unwrap()), vec!["Acme"]);

    let ctx = g.ctx(&[]);
    let created = resolve(&path, &ctx)
        .unwrap()
        .post(&ctx, &json!({ "name": "Globex" }))
        .await
        .unwrap();
    assert!(created.created);

    let mut employers = names(&g.get(&path, &[]).await.unwrap())
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    employers.sort();
    assert_eq!(employers, vec!["Acme", "Globex"]);

    // Reverse direction: the company sees its staff
    let staff = g
        .get(&format!("/Company/{}/Person", g.acme.uuid), &[])
        .await
        .unwrap();
    assert_eq!(names(&staff), vec!["Ada"]);
}

#[tokio::test]
async fn test_relationship_and_node_segments() {
    let g = graph().await;
    let out = g.get(&format!("/{}/out", g.acme.uuid), &[]).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["type"], json!("LOCATED_IN"));

    let ends = g
        .get(&format!("/{}/all/start", g.acme.uuid), &[])
        .await
        .unwrap();
    let mut starts = names(&ends);
    starts.sort();
    assert_eq!(starts, vec!["Acme", "Ada"]);
}

#[tokio::test]
async fn test_named_relation_lifecycle() {
    let g = graph().await;
    let ctx = g.ctx(&[]);

    let created = resolve("/WORKS_AT", &ctx)
        .unwrap()
        .post(
            &ctx,
            &json!({ "source": g.ada.uuid, "target": g.initech.uuid, "since": 2020 }),
        )
        .await
        .unwrap();
    let rel = created.items[0].to_json();
    assert_eq!(rel["since"], json!(2020));

    assert_eq!(g.get("/WORKS_AT", &[]).await.unwrap().len(), 2);

    let bound = format!("/WORKS_AT/{}/end", rel["id"].as_str().unwrap());
    assert_eq!(names(&g.get(&bound, &[]).await.unwrap()), vec!["Initech"]);

    let err = resolve("/LOCATED_IN", &ctx)
        .unwrap()
        .post(&ctx, &json!({ "source": "nope" }))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphPathError::InvalidRequest(_)));
}

// ============================================================================
// Wrappers
// ============================================================================

async fn ranked_people(count: usize) -> Graph {
    let g = graph().await;
    g.store.delete_node(g.ada.uuid).await.unwrap();
    for i in 0..count {
        node(
            &g.store,
            "Person",
            json!({ "name": format!("p{i:02}"), "rank": i, "team": if i % 2 == 0 { "even" } else { "odd" } }),
        )
        .await;
    }
    g
}

#[tokio::test]
async fn test_paging_is_deterministic() {
    let g = ranked_people(25).await;
    let ctx = |page: &'static str| vec![("sort", "rank"), ("page", page), ("pageSize", "10")];

    let first = g.get("/persons", &ctx("1")).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[0]["name"], json!("p00"));
    assert_eq!(first[9]["name"], json!("p09"));

    let third = g.get("/persons", &ctx("3")).await.unwrap();
    assert_eq!(names(&third), vec!["p20", "p21", "p22", "p23", "p24"]);

    assert_eq!(g.get("/persons", &ctx("0")).await.unwrap(), first);
    assert_eq!(g.get("/persons", &ctx("-1")).await.unwrap(), third);
    assert!(g.get("/persons", &ctx("4")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paging_metadata() {
    let g = ranked_people(25).await;
    let ctx = g.ctx(&[("page", "2"), ("pageSize", "10")]);
    let result = resolve("/persons", &ctx).unwrap().get(&ctx).await.unwrap();
    let body = result.to_json();
    assert_eq!(body["page"], json!(2));
    assert_eq!(body["pageCount"], json!(3));
    assert_eq!(body["rawResultCount"], json!(25));
    assert_eq!(body["resultCount"], json!(10));
}

#[tokio::test]
async fn test_sort_is_stable_with_ties() {
    let g = ranked_people(6).await;

    let ascending = g.get("/persons", &[("sort", "team")]).await.unwrap();
    assert_eq!(names(&ascending), vec!["p00", "p02", "p04", "p01", "p03", "p05"]);

    let descending = g
        .get("/persons", &[("sort", "team"), ("order", "desc")])
        .await
        .unwrap();
    assert_eq!(names(&descending), vec!["p01", "p03", "p05", "p00", "p02", "p04"]);
}

#[tokio::test]
async fn test_sort_mixed_kinds_and_missing_values() {
    let g = ranked_people(0).await;
    for i in 0..30 {
        let tag = match i % 3 {
            0 => json!(format!("t{:02}", 29 - i)),
            1 => json!(29 - i),
            _ => Value::Null,
        };
        let mut props = json!({ "name": format!("m{i:02}") });
        if !tag.is_null() {
            props["tag"] = tag;
        }
        node(&g.store, "Person", props).await;
    }

    let sorted = g.get("/persons", &[("sort", "tag")]).await.unwrap();
    assert_eq!(sorted.len(), 30);
    assert!(sorted[..10].iter().all(|item| item.get("tag").is_none()));
    assert_eq!(sorted[0]["name"], json!("m02"));
    assert_eq!(sorted[10]["tag"], json!(1));
    assert_eq!(sorted[19]["tag"], json!(28));
    assert_eq!(sorted[20]["tag"], json!("t02"));
    assert_eq!(sorted[29]["tag"], json!("t29"));

    let descending = g
        .get("/persons", &[("sort", "tag"), ("order", "desc")])
        .await
        .unwrap();
    assert_eq!(descending[0]["tag"], json!("t29"));
    assert!(descending[20..].iter().all(|item| item.get("tag").is_none()));
}

#[tokio::test]
async fn test_sort_by_related_property() {
    let g = graph().await;
    let grace = node(&g.store, "Person", json!({ "name": "Grace" })).await;
    link(&g.store, "WORKS_AT", &grace, &g.initech).await;
    node(&g.store, "Person", json!({ "name": "Nobody" })).await;

    let sorted = g
        .get("/persons", &[("sort", "employer.name"), ("order", "desc")])
        .await
        .unwrap();
    assert_eq!(names(&sorted), vec!["Grace", "Ada", "Nobody"]);
}

#[tokio::test]
async fn test_view_and_ids_wrappers() {
    let g = graph().await;
    let public = g
        .get(&format!("/Person/{}/public", g.ada.uuid), &[])
        .await
        .unwrap();
    assert_eq!(public[0]["name"], json!("Ada"));
    assert!(public[0].get("rank").is_none());
    assert_eq!(public[0]["id"], json!(g.ada.uuid.to_string()));

    let ids = g.get("/cities/ids", &[]).await.unwrap();
    assert_eq!(
        ids,
        vec![json!(g.london.uuid.to_string()), json!(g.paris.uuid.to_string())]
    );
}

#[tokio::test]
async fn test_query_parameters_filter_type_collections() {
    let g = ranked_people(10).await;
    let hits = g
        .get("/persons", &[("rank", "[3 TO 5]"), ("team", "odd")])
        .await
        .unwrap();
    assert_eq!(names(&hits), vec!["p03", "p05"]);

    let err = g.get("/persons", &[("colour", "red")]).await.unwrap_err();
    assert!(matches!(err, GraphPathError::InvalidSearchField { .. }));
}

// ============================================================================
// Verbs and signatures
// ============================================================================

#[tokio::test]
async fn test_verb_table() {
    let g = graph().await;
    let ctx = g.ctx(&[]);
    let typed = resolve(&format!("/Person/{}", g.ada.uuid), &ctx).unwrap();
    assert_eq!(typed.kind(), ResourceKind::TypedId);
    assert_eq!(
        typed.allowed_verbs(),
        vec![Verb::Get, Verb::Head, Verb::Put, Verb::Delete, Verb::Options]
    );

    let err = typed.post(&ctx, &json!({})).await.unwrap_err();
    assert!(matches!(err, GraphPathError::IllegalMethod { .. }));

    let Outcome::Head(head) = execute(&resolve("/cities", &ctx).unwrap(), Verb::Head, &ctx, &Value::Null)
        .await
        .unwrap()
    else {
        panic!("expected a head result");
    };
    assert_eq!(head.result_count, 2);
    assert!(head.is_collection);

    let err = resolve("/Person", &ctx).unwrap().put(&ctx, &json!({})).await.unwrap_err();
    assert!(matches!(err, GraphPathError::IllegalMethod { .. }));
}

#[tokio::test]
async fn test_delete_cascades_relationships() {
    let g = graph().await;
    let ctx = g.ctx(&[]);
    resolve(&format!("/Company/{}", g.acme.uuid), &ctx)
        .unwrap()
        .delete(&ctx)
        .await
        .unwrap();
    assert!(g.get("/WORKS_AT", &[]).await.unwrap().is_empty());
    assert!(g
        .get(&format!("/Person/{}/Company", g.ada.uuid), &[])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_signatures_ignore_identifiers() {
    let g = graph().await;
    let ctx = g.ctx(&[]);
    let by_uuid = resolve(&format!("/Person/{}/Company", g.ada.uuid), &ctx).unwrap();
    let by_id = resolve(&format!("/Person/{}/Company", g.ada.node_id), &ctx).unwrap();
    assert_eq!(by_uuid.signature(), "Person/Company");
    assert_eq!(by_uuid.signature(), by_id.signature());
    assert_eq!(
        resource_signature(&format!("/Person/{}/Company", g.ada.uuid)),
        by_uuid.signature()
    );
}

#[test]
fn test_resolution_needs_no_runtime() {
    let g = tokio_test::block_on(graph());
    let resource = resolve("/_schema/Person", &g.ctx(&[])).unwrap();
    assert_eq!(resource.kind(), ResourceKind::Schema);
    assert!(!resource.is_collection());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pages_cover_the_collection(count in 0usize..30, page_size in 1usize..8) {
        let g = tokio_test::block_on(ranked_people(count));
        let all = tokio_test::block_on(g.get("/persons", &[("sort", "rank")])).unwrap();
        prop_assert_eq!(all.len(), count);

        let size = page_size.to_string();
        let page = |page: i64| {
            let page = page.to_string();
            tokio_test::block_on(g.get(
                "/persons",
                &[("sort", "rank"), ("page", page.as_str()), ("pageSize", size.as_str())],
            ))
            .unwrap()
        };

        let page_count = count.div_ceil(page_size) as i64;
        let mut joined = Vec::new();
        for p in 1..=page_count {
            let items = page(p);
            prop_assert!(!items.is_empty() && items.len() <= page_size);
            prop_assert_eq!(&page(p - page_count - 1), &items);
            joined.extend(items);
        }
        prop_assert_eq!(joined, all);
        prop_assert_eq!(page(0), page(1));
        prop_assert!(page(page_count + 1).is_empty());
    }
}
