//! API Integration Tests
//!
//! Every test runs against the bundled demo graph and access rules.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use graphpath_api::{create_router_for_testing, middleware::auth::issue_token};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "dev-secret-key";

const ADA: &str = "3b0e6a52-5d1f-4c1e-9a40-000000000001";
const GRACE: &str = "3b0e6a52-5d1f-4c1e-9a40-000000000002";
const ACME: &str = "3b0e6a52-5d1f-4c1e-9a40-000000000010";
const INITECH: &str = "3b0e6a52-5d1f-4c1e-9a40-000000000011";

fn token(roles: &[&str]) -> String {
    issue_token(
        SECRET,
        "tester",
        roles.iter().map(|r| r.to_string()).collect(),
        3600,
    )
    .unwrap()
}

/// Helper to create a test request
fn create_request(
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn names(json: &Value) -> Vec<String> {
    json["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("GET", "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_schema() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["schema_types"], 4);
    assert_eq!(json["checks"]["schema_relationships"], 2);
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = create_router_for_testing().await;
    send(&app, create_request("GET", "/health", None, None)).await;
    send(&app, create_request("GET", "/health", None, None)).await;

    let response = send(&app, create_request("GET", "/metrics", None, None)).await;
    let json = json_body(response).await;
    assert_eq!(json["total_requests"], 3);
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[tokio::test]
async fn test_type_collections() {
    let app = create_router_for_testing().await;

    let exact = send(&app, create_request("GET", "/api/persons", None, None)).await;
    assert_eq!(exact.status(), StatusCode::OK);
    assert_eq!(json_body(exact).await["resultCount"], 2);

    let inheriting = send(
        &app,
        create_request("GET", "/api/Person?sort=name&order=desc", None, None),
    )
    .await;
    assert_eq!(inheriting.status(), StatusCode::OK);
    assert_eq!(
        names(&json_body(inheriting).await),
        vec!["Linus", "Grace", "Ada"]
    );
}

#[tokio::test]
async fn test_search_by_query_params() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("GET", "/api/Person?team=kernel", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(names(&json_body(response).await), vec!["Linus"]);
}

#[tokio::test]
async fn test_connected_path() {
    let app = create_router_for_testing().await;

    let employers = send(
        &app,
        create_request("GET", &format!("/api/Person/{ADA}/Company"), None, None),
    )
    .await;
    assert_eq!(employers.status(), StatusCode::OK);
    assert_eq!(names(&json_body(employers).await), vec!["Acme"]);

    let city = send(
        &app,
        create_request(
            "GET",
            &format!("/api/Person/{ADA}/Company/{ACME}/City"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(city.status(), StatusCode::OK);
    assert_eq!(names(&json_body(city).await), vec!["London"]);
}

#[tokio::test]
async fn test_disconnected_path_is_not_found() {
    let app = create_router_for_testing().await;

    let response = send(
        &app,
        create_request(
            "GET",
            &format!("/api/Person/{ADA}/Company/{INITECH}"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_path_errors() {
    let app = create_router_for_testing().await;

    let illegal = send(&app, create_request("GET", "/api/persons/persons", None, None)).await;
    assert_eq!(illegal.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(illegal).await["code"], "ILLEGAL_PATH");

    let unknown = send(&app, create_request("GET", "/api/unicorns", None, None)).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let bad_size = send(&app, create_request("GET", "/api/persons?pageSize=0", None, None)).await;
    assert_eq!(bad_size.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paging_metadata() {
    let app = create_router_for_testing().await;

    let response = send(
        &app,
        create_request("GET", "/api/Person?sort=name&page=2&pageSize=2", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(names(&json), vec!["Linus"]);
    assert_eq!(json["page"], 2);
    assert_eq!(json["pageCount"], 2);
    assert_eq!(json["rawResultCount"], 3);
}

#[tokio::test]
async fn test_head_reports_counts() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("HEAD", "/api/persons?pageSize=1", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-result-count").unwrap(), "1");
    assert_eq!(response.headers().get("x-page-count").unwrap(), "2");
}

#[tokio::test]
async fn test_options_lists_verbs() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("OPTIONS", "/api/persons", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let allow = response.headers().get(header::ALLOW).unwrap().to_str().unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("POST"));
    assert!(!allow.contains("PUT"));
}

// =============================================================================
// Access Control Tests
// =============================================================================

#[tokio::test]
async fn test_anonymous_write_requires_authentication() {
    let app = create_router_for_testing().await;

    let response = send(
        &app,
        create_request("POST", "/api/persons", None, Some(json!({ "name": "Hedy" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_authenticated_create() {
    let app = create_router_for_testing().await;
    let token = token(&[]);

    let response = send(
        &app,
        create_request(
            "POST",
            "/api/persons",
            Some(&token),
            Some(json!({ "name": "Hedy", "rank": 4 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["result"]["name"], "Hedy");

    let listing = send(&app, create_request("GET", "/api/persons", None, None)).await;
    assert_eq!(json_body(listing).await["resultCount"], 3);
}

#[tokio::test]
async fn test_role_restricted_write() {
    let app = create_router_for_testing().await;
    let body = json!({ "name": "Globex" });

    let without_role = send(
        &app,
        create_request("POST", "/api/companies", Some(&token(&[])), Some(body.clone())),
    )
    .await;
    assert_eq!(without_role.status(), StatusCode::FORBIDDEN);

    let editor = send(
        &app,
        create_request("POST", "/api/companies", Some(&token(&["editor"])), Some(body)),
    )
    .await;
    assert_eq!(editor.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_unlisted_signature_allows_authenticated_reads_only() {
    let app = create_router_for_testing().await;
    let uri = format!("/api/Person/{ADA}/public");

    let anonymous = send(&app, create_request("GET", &uri, None, None)).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, create_request("GET", &uri, Some(&token(&[])), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["view"], "public");
    assert_eq!(json["result"]["name"], "Ada");
    assert!(json["result"].get("rank").is_none());
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = create_router_for_testing().await;

    let response = send(
        &app,
        create_request("GET", "/api/persons", Some("not-a-token"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Write Tests
// =============================================================================

#[tokio::test]
async fn test_unsupported_verb() {
    let app = create_router_for_testing().await;

    let response = send(
        &app,
        create_request("PUT", "/api/persons", Some(&token(&[])), Some(json!({}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().get(header::ALLOW).is_some());
}

#[tokio::test]
async fn test_update_and_delete_node() {
    let app = create_router_for_testing().await;
    let token = token(&[]);
    let uri = format!("/api/persons/{GRACE}");

    let updated = send(
        &app,
        create_request("PUT", &uri, Some(&token), Some(json!({ "team": "compilers" }))),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(json_body(updated).await["result"]["team"], "compilers");

    let deleted = send(&app, create_request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = send(&app, create_request("GET", &uri, None, None)).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let app = create_router_for_testing().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/persons")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(&[])))
        .body(Body::from("{name"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schema_is_public() {
    let app = create_router_for_testing().await;

    let response = send(&app, create_request("GET", "/api/_schema", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["resultCount"], 4);
}
