//! HTTP analysis endpoints against a mock generator and a mock upstream.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feelform_llm::{MockGenerator, MockResponse, TextGenerator};
use feelform_relay::{start, ConfigError, GeneratorSlot, LlmConfig, ServerConfig, ServerHandle};

async fn boot(generator: GeneratorSlot) -> ServerHandle {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerConfig::default()
    };
    start(config, generator).await.unwrap()
}

async fn boot_mock(responses: Vec<MockResponse>) -> (ServerHandle, Arc<MockGenerator>) {
    let mock = Arc::new(MockGenerator::new(responses));
    let generator: Arc<dyn TextGenerator> = mock.clone();
    (boot(Ok(generator)).await, mock)
}

async fn post(server: &ServerHandle, route: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}{route}", server.port))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn chat_reply(content: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

#[tokio::test]
async fn analyze_returns_sanitized_feeling() {
    let (server, mock) = boot_mock(vec![MockResponse::text(
        "Sure! {\"warmth\": 2, \"calm\": \"0.25\", \"energy\": null, \"keywords\": [\"sun\", \"\"]}",
    )])
    .await;

    let (status, body) = post(&server, "/api/analyze", json!({ "text": "  sunny day  " })).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "warmth": 1.0, "calm": 0.25, "energy": 0.5, "keywords": ["sun"] })
    );
    assert!(mock.requests()[0].user.contains("\"\"\"sunny day\"\"\""));
}

#[tokio::test]
async fn missing_or_blank_text_is_400_before_config_check() {
    let server = boot(Err(ConfigError::MissingEndpoint)).await;
    for body in [json!({}), json!({ "text": 5 }), json!({ "text": "   " })] {
        let (status, resp) = post(&server, "/api/analyze", body).await;
        assert_eq!(status, 400);
        assert_eq!(resp, json!({ "error": "text is required" }));
    }
}

#[tokio::test]
async fn unconfigured_generator_is_500() {
    let server = boot(Err(ConfigError::MissingApiKey)).await;
    let (status, body) = post(&server, "/api/feel", json!({ "text": "hi" })).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "OPENAI_API_KEY is not set" }));
}

#[tokio::test]
async fn non_json_model_output_is_502_with_raw() {
    let (server, _) = boot_mock(vec![MockResponse::text("I cannot comply")]).await;
    let (status, body) = post(&server, "/api/analyze", json!({ "text": "hi" })).await;
    assert_eq!(status, 502);
    assert_eq!(
        body,
        json!({ "error": "Model output was not valid JSON", "raw": "I cannot comply" })
    );
}

#[tokio::test]
async fn motion_plan_resanitizes_client_feeling() {
    let (server, mock) = boot_mock(vec![MockResponse::json(&json!({
        "mood": "bright",
        "motion": "PULSE",
        "params": { "speed": 99 }
    }))])
    .await;

    let (status, body) = post(
        &server,
        "/api/motion-plan",
        json!({ "text": "go", "feeling": { "warmth": 5, "calm": -1, "energy": "x" } }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["mood"], "bright");
    assert_eq!(body["motion"], "pulse");
    assert!(body["params"]["hue"].as_f64().is_some());
    assert!(mock.requests()[0].user.contains("warmth=1.00, calm=0.00, energy=0.50"));
}

#[tokio::test]
async fn feel_chains_both_calls() {
    let (server, mock) = boot_mock(vec![
        MockResponse::json(&json!({ "warmth": 0.8, "calm": 0.6, "energy": 0.4, "keywords": ["tea"] })),
        MockResponse::json(&json!({ "mood": "cozy", "evidence": "tea", "motion": "breathing", "params": {} })),
    ])
    .await;

    let (status, body) = post(&server, "/api/feel", json!({ "text": "warm tea" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["feeling"]["keywords"], json!(["tea"]));
    assert_eq!(body["plan"]["motion"], "breathing");
    let hue = body["plan"]["params"]["hue"].as_f64().unwrap();
    assert!((hue - 60.0).abs() < 1e-9);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn feel_fails_whole_request_when_second_call_fails() {
    let (server, _) = boot_mock(vec![
        MockResponse::json(&json!({ "warmth": 0.5 })),
        MockResponse::text("nope"),
    ])
    .await;
    let (status, body) = post(&server, "/api/feel", json!({ "text": "x" })).await;
    assert_eq!(status, 502);
    assert!(body.get("feeling").is_none());
}

#[tokio::test]
async fn upstream_endpoint_round_trip() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            "```json\n{\"warmth\": 0.2, \"calm\": 0.9, \"energy\": 0.1, \"keywords\": [\"rain\"]}\n```",
        )))
        .expect(1)
        .mount(&upstream)
        .await;

    let llm = LlmConfig {
        endpoint: Some(format!("{}/v1/chat/completions", upstream.uri())),
        api_key: Some(SecretString::from("sk-test".to_owned())),
        ..LlmConfig::default()
    };
    let server = boot(llm.build_generator()).await;

    let (status, body) = post(&server, "/api/analyze", json!({ "text": "rainy" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["keywords"], json!(["rain"]));
    assert_eq!(body["calm"], 0.9);
}

#[tokio::test]
async fn upstream_error_is_503_with_details() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "overloaded" })))
        .mount(&upstream)
        .await;

    let llm = LlmConfig {
        endpoint: Some(upstream.uri()),
        api_key: Some(SecretString::from("k".to_owned())),
        ..LlmConfig::default()
    };
    let server = boot(llm.build_generator()).await;

    let (status, body) = post(&server, "/api/analyze", json!({ "text": "hi" })).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "LLM proxy request failed");
    assert_eq!(body["details"], json!({ "status": 500, "body": { "error": "overloaded" } }));
}
