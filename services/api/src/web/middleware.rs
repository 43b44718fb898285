//! services/api/src/web/middleware.rs
//!
//! API-key middleware and the catch-all handlers for unknown routes and panics.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;
use tracing::error;

use crate::error::HttpError;
use crate::web::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths reachable without the API key: the health probe, the admin
/// namespace (it has its own token) and the API docs.
fn bypasses_api_key(path: &str) -> bool {
    path == "/health"
        || path == "/admin"
        || path.starts_with("/admin/")
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

/// Middleware that checks the `x-api-key` header against the shared secret.
///
/// A missing header, a header that is not valid text, or a wrong key is a 403.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    if bypasses_api_key(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let supplied = req
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| v.to_str().unwrap_or_default());
    state.gate().check_api_key(supplied)?;

    Ok(next.run(req).await)
}

/// Fallback for routes that do not exist.
pub async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}

/// Turns a handler panic into the generic 500 body.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_health_admin_and_docs_bypass_the_key() {
        for path in ["/health", "/admin/login", "/admin/raw-timetable", "/swagger-ui/", "/api-docs/openapi.json"] {
            assert!(bypasses_api_key(path), "{path}");
        }
        for path in ["/api/timetable", "/", "/healthz", "/administrator", "/unknown"] {
            assert!(!bypasses_api_key(path), "{path}");
        }
    }

    #[tokio::test]
    async fn panic_response_is_the_generic_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Something went wrong");
    }
}
