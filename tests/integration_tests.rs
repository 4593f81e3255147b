//! HTTP surface integration tests
//!
//! Spins the full router up in-process and checks endpoint contracts
//! that do not require a live upstream: health checks, validation
//! failures, routing rejections, and the CORS preflight.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum_test::TestServer;
use chatgateway::config::{GatewayConfig, LoggingConfig, OpenRouterConfig, ServerConfig, Settings};
use chatgateway::handlers::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig { host: "localhost".to_string(), port: 8080 },
        openrouter: OpenRouterConfig {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            site_url: "http://localhost:3000".to_string(),
            site_name: "chatgateway".to_string(),
            default_model: "google/gemini-2.0-flash-exp:free".to_string(),
            api_keys: vec![],
            timeout: 30,
            stream_timeout: 300,
        },
        gateway: GatewayConfig { max_retries: 5, temperature: 0.7, max_tokens: 1000 },
        logging: LoggingConfig { level: "info".to_string(), format: "text".to_string() },
    }
}

async fn test_server() -> TestServer {
    let router = create_router(test_settings()).await.unwrap();
    TestServer::new(router).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server().await;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "chatgateway");
    assert_eq!(body["details"]["configured_keys"], 0);
}

#[tokio::test]
async fn test_liveness_check() {
    let server = test_server().await;

    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_complete_rejects_unknown_model() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/complete")
        .json(&json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "modelId": "gpt-4o"
        }))
        .await;

    // Expected failures are carried in the outcome body, not the status
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unknown model provider.");
}

#[tokio::test]
async fn test_complete_rejects_byok_without_key() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/complete")
        .json(&json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "modelId": "anthropic/claude-4-sonnet:byok"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["error"], "No Anthropic API key set.");
}

#[tokio::test]
async fn test_complete_validates_empty_messages() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/complete")
        .json(&json!({ "messages": [] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Message list cannot be empty"));
}

#[tokio::test]
async fn test_stream_with_empty_pool_returns_error_body() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/stream")
        .json(&json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "modelId": "google/gemini-2.0-flash-exp:free"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"], "No OpenRouter API keys are configured");
}

#[tokio::test]
async fn test_stream_rejects_byok_models() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/stream")
        .json(&json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "modelId": "openai/gpt-4o:byok",
            "apiKey": "sk-user"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Streaming is only supported for free models in this version.");
}

#[tokio::test]
async fn test_title_validates_empty_message() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/title")
        .json(&json!({ "firstMessage": "   " }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_preflight_allows_any_origin() {
    let router = create_router(test_settings()).await.unwrap();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat/stream")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let server = test_server().await;

    let response = server
        .post("/api/chat/complete")
        .text("{not json}")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
