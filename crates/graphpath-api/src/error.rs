//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use graphpath_core::GraphPathError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    IllegalPath(String),
    MethodNotAllowed { method: String, resource: String },
    InvalidSearchField { entity_type: String, key: String },
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Store(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IllegalPath(_)
            | AppError::InvalidSearchField { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a graph error for a caller that is (or is not) authenticated
    pub fn for_caller(err: GraphPathError, authenticated: bool) -> Self {
        match err {
            GraphPathError::NotAllowed { reason } if !authenticated => {
                AppError::Unauthorized(reason)
            }
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::NotFound(msg) => ApiError::new("NOT_FOUND", format!("{msg} not found")),
            AppError::IllegalPath(msg) => ApiError::new("ILLEGAL_PATH", msg),
            AppError::MethodNotAllowed { method, resource } => ApiError::new(
                "METHOD_NOT_ALLOWED",
                format!("{method} is not supported by {resource}"),
            ),
            AppError::InvalidSearchField { entity_type, key } => ApiError::new(
                "INVALID_SEARCH_FIELD",
                format!("{entity_type} has no searchable property '{key}'"),
            ),
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Unauthorized(msg) => {
                ApiError::new("UNAUTHORIZED", "Authentication required").with_details(msg)
            }
            AppError::Forbidden(msg) => ApiError::new("FORBIDDEN", "Access denied").with_details(msg),
            AppError::Store(msg) => {
                tracing::error!(error = %msg, "Store operation failed");
                ApiError::new("STORE_ERROR", "Store operation failed").with_details(msg)
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::internal_error().with_details(msg)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<GraphPathError> for AppError {
    fn from(err: GraphPathError) -> Self {
        match err {
            GraphPathError::NotFound(msg) => AppError::NotFound(msg),
            GraphPathError::IllegalPath(msg) => AppError::IllegalPath(msg),
            GraphPathError::IllegalMethod { method, resource } => {
                AppError::MethodNotAllowed { method, resource }
            }
            GraphPathError::NotAllowed { reason } => AppError::Forbidden(reason),
            GraphPathError::InvalidSearchField { entity_type, key } => {
                AppError::InvalidSearchField { entity_type, key }
            }
            GraphPathError::InvalidRequest(msg) => AppError::BadRequest(msg),
            GraphPathError::Store(msg) => AppError::Store(msg),
            GraphPathError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            GraphPathError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GraphPathError::not_found("Person 1"), StatusCode::NOT_FOUND),
            (GraphPathError::illegal_path("Person/Person"), StatusCode::BAD_REQUEST),
            (
                GraphPathError::illegal_method("POST", "TypedId"),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (
                GraphPathError::invalid_search_field("Person", "colour"),
                StatusCode::BAD_REQUEST,
            ),
            (
                GraphPathError::InvalidRequest("pageSize".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GraphPathError::Store("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_not_allowed_depends_on_caller() {
        let denied = || GraphPathError::NotAllowed {
            reason: "GET on 'persons'".into(),
        };
        assert_eq!(
            AppError::for_caller(denied(), false).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::for_caller(denied(), true).status(),
            StatusCode::FORBIDDEN
        );
    }
}
