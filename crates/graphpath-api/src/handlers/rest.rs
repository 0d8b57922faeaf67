//! Resource chain endpoint
//!
//! Every request below `/api/` is resolved into a resource chain, checked
//! against the access rules of its signature and answered by the verb the
//! request carries.
//!
//! Author: hephaex@gmail.com

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use graphpath_resource::{execute, resolve, HeadResult, Outcome, Principal, Verb};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Number of items in a HEAD answer
pub const RESULT_COUNT_HEADER: &str = "x-result-count";
/// Current page of a paged HEAD answer
pub const PAGE_HEADER: &str = "x-page";
/// Page size of a paged HEAD answer
pub const PAGE_SIZE_HEADER: &str = "x-page-size";
/// Page count of a paged HEAD answer
pub const PAGE_COUNT_HEADER: &str = "x-page-count";
/// Item count before paging
pub const RAW_RESULT_COUNT_HEADER: &str = "x-raw-result-count";

/// Resolve and answer a resource chain
#[utoipa::path(
    get,
    path = "/api/{path}",
    tag = "resources",
    params(
        ("path" = String, Path, description = "Resource chain, e.g. Person/42/Company"),
        ("sort" = Option<String>, Query, description = "Comma separated sort keys, dotted keys follow relationships"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<i64>, Query, description = "1-based page number"),
        ("pageSize" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Resource content"),
        (status = 400, description = "Illegal path or request", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError),
        (status = 403, description = "Access denied", body = ApiError),
        (status = 404, description = "Resource not found", body = ApiError),
        (status = 405, description = "Verb not supported by the resource", body = ApiError)
    )
)]
pub async fn rest_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    principal: Option<Extension<Principal>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let verb = Verb::parse(method.as_str()).ok_or_else(|| AppError::MethodNotAllowed {
        method: method.to_string(),
        resource: path.clone(),
    })?;
    let principal = principal.map(|Extension(p)| p);
    let authenticated = principal.is_some();

    let ctx = state.request_context(params, principal);
    let resource = resolve(&path, &ctx)?;

    let signature = resource.signature();
    state
        .access
        .check(&signature, ctx.principal.as_ref(), verb)
        .map_err(|e| AppError::for_caller(e, authenticated))?;

    let allowed_verbs = resource.allowed_verbs();
    if !allowed_verbs.contains(&verb) {
        let allowed = allow_header(&allowed_verbs);
        let mut response = AppError::MethodNotAllowed {
            method: verb.to_string(),
            resource: resource.kind().to_string(),
        }
        .into_response();
        response.headers_mut().insert(header::ALLOW, allowed);
        return Ok(response);
    }

    let body = parse_body(&body)?;
    debug!(verb = %verb, kind = %resource.kind(), %signature, "Executing request");
    let outcome = execute(&resource, verb, &ctx, &body).await?;

    if verb.is_write() {
        info!(verb = %verb, path = %path, "Graph modified");
    }
    Ok(into_response(verb, outcome))
}

fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

fn into_response(verb: Verb, outcome: Outcome) -> Response {
    match outcome {
        Outcome::Result(result) if verb == Verb::Delete && result.is_empty() => {
            StatusCode::NO_CONTENT.into_response()
        }
        Outcome::Result(result) => {
            let status = if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(result.to_json())).into_response()
        }
        Outcome::Head(head) => (StatusCode::OK, head_headers(&head)).into_response(),
        Outcome::Options(verbs) => {
            let names: Vec<&str> = verbs.iter().map(Verb::as_str).collect();
            (
                StatusCode::OK,
                [(header::ALLOW, allow_header(&verbs))],
                Json(json!({ "allow": names })),
            )
                .into_response()
        }
    }
}

fn allow_header(verbs: &[Verb]) -> HeaderValue {
    let joined = verbs.iter().map(Verb::as_str).collect::<Vec<_>>().join(", ");
    HeaderValue::from_str(&joined).unwrap_or_else(|_| HeaderValue::from_static("OPTIONS"))
}

fn head_headers(head: &HeadResult) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: usize| {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    };

    put(RESULT_COUNT_HEADER, head.result_count);
    if let Some(page) = &head.page {
        put(PAGE_HEADER, page.page);
        put(PAGE_SIZE_HEADER, page.page_size);
        put(PAGE_COUNT_HEADER, page.page_count);
        put(RAW_RESULT_COUNT_HEADER, page.raw_result_count);
    }
    headers
}
