use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use klassflow_backend::middleware::{
    logging::log_error_responses,
    request_id::{request_id, RequestId},
};
use tower::ServiceExt;
use uuid::Uuid;

fn echo_app() -> Router {
    Router::new()
        .route(
            "/echo",
            get(|Extension(id): Extension<RequestId>| async move { id.0 }),
        )
        .route(
            "/api/signature/{token}",
            get(|| async { (StatusCode::GONE, "gone") }),
        )
        .layer(middleware::from_fn(log_error_responses))
        .layer(middleware::from_fn(request_id))
}

#[tokio::test]
async fn generated_request_id_is_exposed_to_handlers_and_response() {
    let response = echo_app()
        .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let header = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(Uuid::parse_str(&header).is_ok());

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(body.to_vec()).unwrap(), header);
}

#[tokio::test]
async fn correlation_id_is_reused_when_request_id_is_missing() {
    let response = echo_app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header("x-correlation-id", "corr-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "corr-42");
}

#[tokio::test]
async fn oversized_client_id_is_replaced() {
    let response = echo_app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header("x-request-id", "x".repeat(500))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let header = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(Uuid::parse_str(header).is_ok());
}

#[tokio::test]
async fn error_body_survives_error_logging() {
    let response = echo_app()
        .oneshot(
            Request::builder()
                .uri("/api/signature/deadbeefcafe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GONE);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"gone");
}
