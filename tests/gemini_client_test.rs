use std::sync::Arc;
use std::time::Duration;

use roomgen::config::{AuthScheme, Credential, GeminiConfig, TimeoutConfig};
use roomgen::upstream::codec::encode_base64;
use roomgen::upstream::{build_http_client, FallbackOrchestrator, GeminiImageClient, RetryPolicy, UpstreamImageClient};
use roomgen::{AspectRatio, GenerationRequest, ImageSize, ModelId, UpstreamResult};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrendered-room";
const PRO_PATH: &str = "/v1beta/models/gemini-3-pro-image-preview:generateContent";
const FLASH_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

fn client_at(base_url: String, timeouts: TimeoutConfig) -> GeminiImageClient {
    let http = build_http_client(&timeouts).unwrap();
    let config = GeminiConfig::new()
        .with_base_url(base_url)
        .with_credential(Credential::Static("test-key".into()));
    GeminiImageClient::new(http, config, RetryPolicy::new(3, Duration::from_millis(1)))
}

fn client_for(server: &MockServer, credential: Credential, auth_scheme: AuthScheme) -> GeminiImageClient {
    let http = build_http_client(&TimeoutConfig::default()).unwrap();
    let config = GeminiConfig::new()
        .with_base_url(server.uri())
        .with_credential(credential)
        .with_auth_scheme(auth_scheme);
    GeminiImageClient::new(http, config, RetryPolicy::new(3, Duration::from_millis(1)))
}

fn short_read_timeout() -> TimeoutConfig {
    TimeoutConfig {
        connect: Duration::from_secs(1),
        read: Duration::from_millis(200),
        write: Duration::from_secs(1),
    }
}

fn client(server: &MockServer) -> GeminiImageClient {
    client_for(server, Credential::Static("test-key".into()), AuthScheme::Bearer)
}

fn image_body() -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    {"text": "Here is the renovated room."},
                    {"inlineData": {"mimeType": "image/png", "data": encode_base64(PNG)}}
                ]
            },
            "finishReason": "STOP"
        }]
    })
}

fn request() -> GenerationRequest {
    GenerationRequest::builder("Renovate this room")
        .with_reference_image(b"\xff\xd8\xff\xe0photo".to_vec())
        .with_aspect_ratio(AspectRatio::Landscape4x3)
        .with_image_size(ImageSize::TwoK)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_success_returns_decoded_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {"aspectRatio": "4:3", "imageSize": "2K"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;

    match result {
        UpstreamResult::Success { images, model_used } => {
            assert_eq!(model_used, ModelId::GeminiProImage);
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].bytes, PNG);
            assert_eq!(images[0].mime_type, "image/png");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snake_case_response_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"inline_data": {"mime_type": "image/png", "data": encode_base64(PNG)}}]}
            }]
        })))
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;
    assert!(result.is_success(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_empty_candidates_are_retried_then_reported_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .expect(3)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;

    assert!(result.is_retryable(), "unexpected result: {:?}", result);
    assert!(result.failure_reason().unwrap().contains("no candidates"));
}

#[tokio::test]
async fn test_unauthorized_is_terminal_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;

    assert!(result.is_terminal(), "unexpected result: {:?}", result);
    assert!(result.failure_reason().unwrap().contains("401"));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;
    assert!(result.is_success(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_server_error_then_success_on_same_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;
    assert_eq!(result.model_used(), Some(ModelId::GeminiProImage));
}

#[tokio::test]
async fn test_blocked_prompt_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).generate(&request(), ModelId::GeminiProImage).await;
    assert!(result.is_terminal(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_goog_api_key_header_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .and(header("x-goog-api-key", "goog-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Credential::Static("goog-key".into()), AuthScheme::GoogApiKey);
    let result = client.generate(&request(), ModelId::GeminiProImage).await;
    assert!(result.is_success(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_missing_key_never_calls_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, Credential::None, AuthScheme::Bearer);
    let result = client.generate(&request(), ModelId::GeminiProImage).await;

    assert!(result.is_terminal());
    assert!(result.failure_reason().unwrap().contains("missing API key"));
}

#[tokio::test]
async fn test_fallback_moves_to_second_model_after_exhausting_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .and(body_partial_json(json!({"generationConfig": {"imageConfig": {"imageSize": "1K"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = FallbackOrchestrator::new(
        Arc::new(client(&server)),
        vec![ModelId::GeminiProImage, ModelId::GeminiFlashImage],
    );
    let result = orchestrator.generate_with_fallback(&request()).await;

    assert_eq!(result.model_used(), Some(ModelId::GeminiFlashImage));
}

#[tokio::test]
async fn test_terminal_failure_stops_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = FallbackOrchestrator::new(
        Arc::new(client(&server)),
        vec![ModelId::GeminiProImage, ModelId::GeminiFlashImage],
    );
    let result = orchestrator.generate_with_fallback(&request()).await;

    assert!(result.is_terminal(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_all_models_exhausted_reports_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .expect(6)
        .mount(&server)
        .await;

    let orchestrator = FallbackOrchestrator::new(
        Arc::new(client(&server)),
        vec![ModelId::GeminiProImage, ModelId::GeminiFlashImage],
    );
    let result = orchestrator.generate_with_fallback(&request()).await;

    assert!(result.is_retryable(), "unexpected result: {:?}", result);
    let reason = result.failure_reason().unwrap();
    assert!(reason.starts_with("All models failed"));
    assert!(reason.contains("gemini-2.5-flash-image"));
    assert!(reason.contains("no candidates"));
}

async fn mount_slow_model(server: &MockServer, model_path: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(model_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_body())
                .set_delay(Duration::from_millis(800)),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_read_timeout_is_retried_then_retryable() {
    let server = MockServer::start().await;
    mount_slow_model(&server, PRO_PATH, 3).await;

    let client = client_at(server.uri(), short_read_timeout());
    let result = client.generate(&request(), ModelId::GeminiProImage).await;

    assert!(result.is_retryable(), "unexpected result: {:?}", result);
}

#[tokio::test]
async fn test_timed_out_model_falls_back_to_next() {
    let server = MockServer::start().await;
    mount_slow_model(&server, PRO_PATH, 3).await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body()))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = FallbackOrchestrator::new(
        Arc::new(client_at(server.uri(), short_read_timeout())),
        vec![ModelId::GeminiProImage, ModelId::GeminiFlashImage],
    );
    let result = orchestrator.generate_with_fallback(&request()).await;

    assert_eq!(result.model_used(), Some(ModelId::GeminiFlashImage));
}

#[tokio::test]
async fn test_refused_connection_is_retryable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = client_at(format!("http://{}", address), short_read_timeout());
    let result = client.generate(&request(), ModelId::GeminiProImage).await;

    assert!(result.is_retryable(), "unexpected result: {:?}", result);
}
