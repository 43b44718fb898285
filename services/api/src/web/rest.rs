//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the public REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ErrorBody, HttpError};
use crate::web::admin::{
    ChangePasswordRequest, LoginFailure, LoginRequest, LoginResponse, SuccessResponse,
    UpdateRequest, UpdateResponse,
};
use crate::web::extract::QueryParams;
use crate::web::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        timetable_handler,
        crate::web::admin::raw_timetable_handler,
        crate::web::admin::login_handler,
        crate::web::admin::update_handler,
        crate::web::admin::change_password_handler,
    ),
    components(
        schemas(
            HealthResponse, ScheduleSchema, BatchTimetableSchema, RawTimetableSchema, ErrorBody,
            LoginRequest, LoginResponse, LoginFailure, UpdateRequest, UpdateResponse,
            ChangePasswordRequest, SuccessResponse,
        )
    ),
    tags(
        (name = "Timetable API", description = "Weekly class timetables grouped by batch.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Query Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimetableQuery {
    /// Batch code, uppercase letters and digits (e.g. `E16`). Omit to list every batch.
    pub batch: Option<String>,
}

/// Documentation shape of one batch's week. Each day is a list of class objects.
#[derive(Serialize, ToSchema)]
pub struct ScheduleSchema {
    #[serde(rename = "Monday")]
    #[schema(value_type = Vec<Object>)]
    monday: Vec<serde_json::Value>,
    #[serde(rename = "Tuesday")]
    #[schema(value_type = Vec<Object>)]
    tuesday: Vec<serde_json::Value>,
    #[serde(rename = "Wednesday")]
    #[schema(value_type = Vec<Object>)]
    wednesday: Vec<serde_json::Value>,
    #[serde(rename = "Thursday")]
    #[schema(value_type = Vec<Object>)]
    thursday: Vec<serde_json::Value>,
    #[serde(rename = "Friday")]
    #[schema(value_type = Vec<Object>)]
    friday: Vec<serde_json::Value>,
    #[serde(rename = "Saturday")]
    #[schema(value_type = Vec<Object>)]
    saturday: Vec<serde_json::Value>,
}

/// Documentation shape of a list entry: the batch code next to its week.
#[derive(Serialize, ToSchema)]
pub struct BatchTimetableSchema {
    #[schema(example = "E16")]
    batch: String,
    #[serde(flatten)]
    schedule: ScheduleSchema,
}

/// Documentation shape of the persisted timetable document.
#[derive(Serialize, ToSchema)]
pub struct RawTimetableSchema {
    batches: BTreeMap<String, ScheduleSchema>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe. Needs no API key.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Fetch one batch's timetable, or every batch when `batch` is omitted.
#[utoipa::path(
    get,
    path = "/api/timetable",
    params(
        TimetableQuery,
        ("x-api-key" = String, Header, description = "The shared API key.")
    ),
    responses(
        (status = 200, description = "The batch's week, or a list of every batch", body = [BatchTimetableSchema]),
        (status = 400, description = "Invalid batch code or query string", body = ErrorBody),
        (status = 403, description = "Missing or wrong API key", body = ErrorBody),
        (status = 404, description = "Batch not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn timetable_handler(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<TimetableQuery>,
) -> Result<Response, HttpError> {
    match query.batch {
        Some(code) => {
            let schedule = state.service.get_batch(&code).await?;
            Ok(Json(schedule).into_response())
        }
        None => {
            let batches = state.service.list_batches().await?;
            Ok(Json(batches).into_response())
        }
    }
}
