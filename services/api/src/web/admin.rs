//! services/api/src/web/admin.rs
//!
//! Admin endpoints: login, bulk timetable update, password change and the raw
//! data dump. None of them take the API key; writes take the admin token.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use timetable_core::ServiceError;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ErrorBody, HttpError};
use crate::web::extract::{JsonBody, LenientJson};
use crate::web::rest::RawTimetableSchema;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// Login failures keep the `success` flag next to the error.
#[derive(Serialize, ToSchema)]
pub struct LoginFailure {
    pub success: bool,
    pub error: String,
}

/// Documentation shape of the update body. The handler reads the body as
/// untyped JSON so that the token is checked first.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateRequest {
    pub token: Option<String>,
    /// The complete new set of batch timetables.
    #[schema(value_type = Vec<Object>)]
    pub data: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub token: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

fn login_failure(status: StatusCode, error: impl Into<String>) -> Response {
    let body = LoginFailure {
        success: false,
        error: error.into(),
    };
    (status, Json(body)).into_response()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /admin/raw-timetable - The stored timetable file as-is
#[utoipa::path(
    get,
    path = "/admin/raw-timetable",
    responses(
        (status = 200, description = "The persisted `{batches: {...}}` document", body = RawTimetableSchema),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn raw_timetable_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, HttpError> {
    Ok(Json(state.service.raw_timetable().await?))
}

/// POST /admin/login - Exchange the admin username and password for the admin token
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = LoginFailure),
        (status = 401, description = "Invalid credentials", body = LoginFailure),
        (status = 500, description = "Store failure", body = LoginFailure)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Response {
    let (Some(username), Some(password)) = (present(req.username), present(req.password)) else {
        return login_failure(StatusCode::BAD_REQUEST, "Username and password are required");
    };

    match state.gate().login(&username, &password).await {
        Ok(token) => {
            info!(username = %username, "Admin logged in");
            Json(LoginResponse {
                success: true,
                token,
            })
            .into_response()
        }
        Err(ServiceError::AuthFailure(msg)) => login_failure(StatusCode::UNAUTHORIZED, msg),
        Err(e) => {
            let e = HttpError::from(e);
            login_failure(e.status, e.message)
        }
    }
}

/// POST /admin/update - Replace every stored timetable
#[utoipa::path(
    post,
    path = "/admin/update",
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Timetables replaced", body = UpdateResponse),
        (status = 400, description = "Malformed items; nothing was stored", body = ErrorBody),
        (status = 403, description = "Invalid admin token; nothing was stored", body = ErrorBody),
        (status = 500, description = "Write failure", body = ErrorBody)
    )
)]
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    LenientJson(body): LenientJson,
) -> Result<Json<UpdateResponse>, HttpError> {
    // The token travels in the body, so it is read leniently and checked
    // before anything about the body's shape is reported.
    let is_json = body.is_some();
    let (token, data) = match body {
        Some(Value::Object(mut fields)) => (fields.remove("token"), fields.remove("data")),
        _ => (None, None),
    };
    let token = token.as_ref().and_then(Value::as_str);

    let items = match data {
        Some(Value::Array(items)) => items,
        _ => {
            state.gate().verify_admin_token(token).await?;
            return Err(HttpError::bad_request(if is_json {
                "'data' must be an array of batch timetables"
            } else {
                "Request body must be valid JSON"
            }));
        }
    };

    let count = state.service.bulk_replace(token, items).await?;
    Ok(Json(UpdateResponse {
        success: true,
        message: format!("Timetable updated successfully ({} batches)", count),
    }))
}

/// POST /admin/change-password - Change the admin password; the token stays the same
#[utoipa::path(
    post,
    path = "/admin/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 403, description = "Invalid token or current password", body = ErrorBody),
        (status = 500, description = "Write failure", body = ErrorBody)
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, HttpError> {
    let (Some(token), Some(old_password), Some(new_password)) = (
        present(req.token),
        present(req.old_password),
        present(req.new_password),
    ) else {
        return Err(HttpError::bad_request(
            "token, oldPassword and newPassword are required",
        ));
    };

    state
        .service
        .change_password(Some(&token), &old_password, &new_password)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
