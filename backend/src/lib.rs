pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, state::AppState};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}

/// Builds the full HTTP application around the given state.
pub fn build_router(state: AppState) -> Router {
    // Public routes: the signature token is the credential.
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/signature/{token}",
            get(handlers::signature::get_signature).post(handlers::signature::sign),
        )
        .route(
            "/api/signature/{token}/absence",
            post(handlers::signature::declare_absence),
        );

    // Staff routes (bearer JWT, teacher or admin)
    let staff_routes = Router::new()
        .route(
            "/api/sessions/{id}/signature-tokens",
            post(handlers::sessions::issue_signature_token),
        )
        .route(
            "/api/sessions/{id}/signature-requests",
            post(handlers::sessions::request_signatures),
        )
        .route(
            "/api/sessions/{id}/attendance/in-person",
            post(handlers::sessions::sign_in_person),
        )
        .route(
            "/api/sessions/{id}/attendance",
            get(handlers::sessions::session_attendance),
        )
        .route(
            "/api/classrooms/{id}/attendance/summary",
            get(handlers::classrooms::attendance_summary),
        )
        .route(
            "/api/classrooms/{id}/attendance/export",
            get(handlers::classrooms::export_attendance),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_staff,
        ));

    let cors = cors_layer(&state.config.cors_allow_origins);

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(TraceLayer::new_for_http().make_span_with(middleware::redacted_span))
                .layer(axum_middleware::from_fn(middleware::log_error_responses))
                .layer(cors),
        )
        .with_state(state)
}
