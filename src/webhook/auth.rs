//! HTTP Basic authentication for the webhook endpoint
//!
//! Credentials are compared in constant time. Failures return 401 with a
//! `WWW-Authenticate` challenge and never reach the handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

use crate::config::WebhookCredentials;

/// Realm advertised in the `WWW-Authenticate` challenge
const AUTH_REALM: &str = "externalsecret-updater";

fn basic_challenge() -> String {
    format!(r#"Basic realm="{AUTH_REALM}""#)
}

/// Basic authentication failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header
    #[error("missing authorization header")]
    MissingAuth,

    /// Authorization header is not `Basic <base64>`
    #[error("unsupported authorization scheme")]
    InvalidScheme,

    /// Basic payload is not base64 `user:password`
    #[error("malformed basic credentials")]
    Malformed,

    /// Username or password did not match
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": self.to_string()})),
        )
            .into_response();
        if let Ok(challenge) = HeaderValue::from_str(&basic_challenge()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

/// Extract `(username, password)` from a Basic Authorization header
pub fn extract_basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::Malformed)?;

    let encoded = auth_str
        .strip_prefix("Basic ")
        .ok_or(AuthError::InvalidScheme)?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;

    let (username, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;
    Ok((username.to_string(), password.to_string()))
}

impl WebhookCredentials {
    /// Constant-time comparison against the configured credentials
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

/// Check request credentials against `credentials`
pub fn authenticate(
    headers: &HeaderMap,
    credentials: &WebhookCredentials,
) -> Result<(), AuthError> {
    let (username, password) = extract_basic_credentials(headers)?;
    if credentials.matches(&username, &password) {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Middleware rejecting requests without valid Basic credentials
pub async fn require_basic_auth(
    State(credentials): State<Arc<WebhookCredentials>>,
    request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &credentials) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(
                error = %e,
                realm = AUTH_REALM,
                uri = %request.uri(),
                "Rejected webhook request"
            );
            e.into_response()
        }
    }
}
