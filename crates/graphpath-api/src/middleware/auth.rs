//! Bearer token authentication
//!
//! Requests may carry an HMAC-SHA256 signed JWT in the `Authorization`
//! header. A valid token becomes a [`Principal`] in the request extensions;
//! requests without a token pass through anonymously and are judged by the
//! access rules of the resource they resolve to.
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use graphpath_resource::Principal;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Token issuer
pub const ISSUER: &str = "graphpath-api";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - caller identity
    pub sub: String,
    /// JWT ID
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Roles checked against access rules
    #[serde(default)]
    pub roles: Vec<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal::new(claims.sub, claims.roles)
    }
}

/// Token errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SystemTime(e) => AppError::Internal(e.to_string()),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Sign a token for `subject` valid for `ttl_secs`
pub fn issue_token(
    secret: &str,
    subject: &str,
    roles: Vec<String>,
    ttl_secs: u64,
) -> Result<String, AuthError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: subject.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl_secs,
        roles,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verify signature, expiry and issuer
pub fn validate_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Attach the caller's [`Principal`] when a bearer token is present
///
/// A present but invalid token is rejected with 401 rather than downgraded
/// to an anonymous request.
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MalformedHeader)?;

        let claims = validate_token(&state.config.auth.jwt_secret, token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;
        tracing::debug!(subject = %claims.sub, roles = ?claims.roles, "Authenticated request");
        request.extensions_mut().insert(Principal::from(claims));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_validate() {
        let token = issue_token("secret", "ada", vec!["admin".into()], 60).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "ada");
        assert_eq!(claims.iss, ISSUER);

        let principal = Principal::from(claims);
        assert!(principal.has_role("admin"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token("secret", "ada", vec![], 60).unwrap();
        assert!(matches!(
            validate_token("other", &token),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
