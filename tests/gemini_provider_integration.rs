//! Integration tests for the Gemini provider against a mock HTTP server

use aizen::config::GeminiConfig;
use aizen::credentials::{is_credential_error, API_KEY_ERROR_MESSAGE};
use aizen::providers::{GeminiProvider, Message, Provider};
use aizen::service::{AizenService, HaikuResponse};
use aizen::Config;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn provider_for(server: &MockServer) -> GeminiProvider {
    GeminiProvider::new(GeminiConfig {
        api_key: Some("mock-key".to_string()),
        api_base: server.uri(),
        ..GeminiConfig::default()
    })
    .expect("provider should build with a key")
}

fn text_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
    })
}

#[tokio::test]
async fn test_text_completion_sends_system_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "mock-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "Be calm."}]},
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Greetings.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let response = provider
        .complete(&[Message::system("Be calm."), Message::user("Hello")], &[])
        .await
        .unwrap();

    assert_eq!(response.message.text(), Some("Greetings."));
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
}

#[tokio::test]
async fn test_function_call_becomes_tool_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "tools": [{"functionDeclarations": [{"name": "calculate"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "calculate", "args": {"expression": "15% of 80"}}}
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let tools = vec![json!({
        "name": "calculate",
        "description": "Evaluate arithmetic",
        "parameters": {
            "type": "object",
            "properties": {"expression": {"type": "string"}},
            "required": ["expression"]
        }
    })];

    let response = provider_for(&server)
        .complete(&[Message::user("What is 15% of 80?")], &tools)
        .await
        .unwrap();

    let calls = response.message.tool_calls.expect("tool calls");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function.name, "calculate");
    let args: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
    assert_eq!(args["expression"], "15% of 80");
}

#[tokio::test]
async fn test_rejected_key_is_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"reason": "API_KEY_INVALID"}]
            }
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&[Message::user("Hello")], &[])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("400"));
    assert!(is_credential_error(&err));
}

#[tokio::test]
async fn test_server_error_is_not_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&[Message::user("Hello")], &[])
        .await
        .unwrap_err();

    assert!(!is_credential_error(&err));
}

#[tokio::test]
async fn test_service_haiku_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
            "Cherry petals fall\nThe blade rests within its sheath\nSpring wind holds its breath",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.provider.gemini.api_key = Some("mock-key".to_string());
    config.provider.gemini.api_base = server.uri();
    let service = AizenService::from_config(&config).unwrap();

    match service.generate_haiku("spring").await {
        HaikuResponse::Haiku { haiku } => assert!(haiku.starts_with("Cherry petals fall")),
        other => panic!("expected haiku, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_maps_rejected_key_to_configuration_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("API key not valid. Please pass a valid API key."),
        )
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.provider.gemini.api_key = Some("revoked-key".to_string());
    config.provider.gemini.api_base = server.uri();
    let service = AizenService::from_config(&config).unwrap();

    match service.generate_haiku("winter").await {
        HaikuResponse::Error { error } => assert_eq!(error, API_KEY_ERROR_MESSAGE),
        other => panic!("expected error, got {:?}", other),
    }
}
