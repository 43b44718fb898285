//! services/api/src/web/extract.rs
//!
//! Request extractors shared by the handlers.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
};
use serde_json::Value;

use crate::error::HttpError;

/// Like `axum::Json`, but a body that fails to parse is a 400 `{"error": ...}`
/// instead of axum's plain-text 415/422.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                // Keep 413 for oversized bodies.
                let status = match &rejection {
                    JsonRejection::BytesRejection(_)
                        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
                    {
                        StatusCode::PAYLOAD_TOO_LARGE
                    }
                    _ => StatusCode::BAD_REQUEST,
                };
                Err(HttpError::new(status, rejection.body_text()))
            }
        }
    }
}

/// The body parsed as untyped JSON, or `None` when it is not JSON at all.
///
/// For handlers that must authenticate a token carried inside the body before
/// reporting anything about the body's shape. Only an unreadable or oversized
/// body is rejected outright.
pub struct LenientJson(pub Option<Value>);

impl<S> FromRequest<S> for LenientJson
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::new(rejection.status(), rejection.body_text()))?;
        Ok(LenientJson(serde_json::from_slice(&bytes).ok()))
    }
}

/// Like `axum::extract::Query`, but an unparsable query string (for example a
/// repeated `?batch=A&batch=B`) is a 400 `{"error": ...}`.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| QueryParams(value))
            .map_err(|rejection| HttpError::bad_request(rejection.body_text()))
    }
}
