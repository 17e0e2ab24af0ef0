//! Middleware stack tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;

use super::*;

/// Router with the full middleware stack, layered the way the server does.
///
/// The last `.layer()` is outermost, so the request id exists before
/// metrics, tracing and logging run.
fn test_app_with_middleware(metrics: Arc<RequestMetrics>) -> Router {
    Router::new()
        .route("/api/books/:id", get(|| async { "book" }))
        .route(
            "/api/orders",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/api/cart", get(|| async { StatusCode::UNAUTHORIZED }))
        .layer(RequestLoggingLayer::new())
        .layer(TracingLayer::new())
        .layer(MetricsLayer::new(metrics))
        .layer(RequestIdLayer::new())
}

async fn get_path(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// ============================================================
// Logging and tracing
// ============================================================

// Test: requests pass through logging and tracing layers untouched
#[tokio::test]
async fn test_logging_and_tracing_layers_pass_requests_through() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let app = test_app_with_middleware(Arc::new(RequestMetrics::new()));

    let response = get_path(&app, "/api/books/42").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_path(&app, "/api/orders").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================
// Metrics
// ============================================================

#[tokio::test]
async fn test_metrics_are_collected() {
    let metrics = Arc::new(RequestMetrics::new());
    let app = test_app_with_middleware(Arc::clone(&metrics));

    assert_eq!(metrics.snapshot().requests, 0);

    assert_eq!(get_path(&app, "/api/books/1").await.status(), StatusCode::OK);
    assert_eq!(get_path(&app, "/api/books/2").await.status(), StatusCode::OK);
    assert_eq!(
        get_path(&app, "/api/orders").await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        get_path(&app, "/api/cart").await.status(),
        StatusCode::UNAUTHORIZED
    );

    let snap = metrics.snapshot();
    assert_eq!(snap.requests, 4);
    assert_eq!(snap.success, 2);
    assert_eq!(snap.server_errors, 1);
    assert_eq!(snap.auth_rejections, 1);
}

// ============================================================
// CORS
// ============================================================

#[tokio::test]
async fn test_cors_headers_are_set_correctly() {
    let app = Router::new()
        .route("/api/books", get(|| async { "[]" }))
        .layer(cors_layer());

    // Arrange: a browser preflight from the storefront origin
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/books")
        .header("Origin", "http://shop.example.com")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();

    // Act
    let response = app.clone().oneshot(preflight).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/books")
                .header("Origin", "http://shop.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

// ============================================================
// Request id
// ============================================================

fn echo_request_id_app() -> Router {
    Router::new()
        .route(
            "/",
            get(|req: Request<Body>| async move {
                req.headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string()
            }),
        )
        .layer(RequestIdLayer::new())
}

fn response_id(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(REQUEST_ID_HEADER)
        .expect("Response should have x-request-id header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let app = echo_request_id_app();

    // Without a client id one is generated
    let response = get_path(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated = response_id(&response);
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(body, generated.as_bytes(), "handler sees the same id");

    // A client id is propagated
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(REQUEST_ID_HEADER, "checkout-7781")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response_id(&response), "checkout-7781");
}

// Test: an oversized client id is replaced, not echoed
#[tokio::test]
async fn test_oversized_request_id_is_replaced() {
    let app = echo_request_id_app();
    let huge = "a".repeat(MAX_REQUEST_ID_LEN + 10);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(REQUEST_ID_HEADER, huge.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let id = response_id(&response);
    assert_ne!(id, huge);
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}
