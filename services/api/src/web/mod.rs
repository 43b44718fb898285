pub mod admin;
pub mod extract;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use admin::{change_password_handler, login_handler, raw_timetable_handler, update_handler};
pub use middleware::require_api_key;
pub use rest::{health_handler, timetable_handler, ApiDoc};
pub use state::AppState;

/// Timetable uploads carry a whole term of classes at once.
pub const BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Builds the complete application: routes, API-key gate, docs and the
/// shared middleware stack.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(middleware::API_KEY_HEADER),
        ]);

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/timetable", get(timetable_handler));

    let admin_routes = Router::new()
        .route("/admin/raw-timetable", get(raw_timetable_handler))
        .route("/admin/login", post(login_handler))
        .route("/admin/update", post(update_handler))
        .route("/admin/change-password", post(change_password_handler));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(middleware::not_found)
        // A known path with the wrong method is still an unknown endpoint.
        .method_not_allowed_fallback(middleware::not_found)
        // Added after the fallback so unknown routes need the key too.
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .with_state(state)
}
