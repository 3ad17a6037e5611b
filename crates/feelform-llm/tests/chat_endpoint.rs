//! Pipeline calls against a mock Chat Completions endpoint.

use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feelform_llm::pipeline;
use feelform_llm::{ChatCompletionsClient, MotionMode};

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn client(server: &MockServer) -> ChatCompletionsClient {
    ChatCompletionsClient::new(server.uri(), SecretString::from("sk-abc".to_owned()))
        .with_model("test-model")
        .with_temperature(0.5)
}

#[tokio::test]
async fn request_shape_is_chat_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-abc"))
        .and(body_partial_json(json!({ "model": "test-model", "temperature": 0.5 })))
        .respond_with(reply(r#"{"warmth":0.9,"calm":0.1,"energy":0.8,"keywords":["joy"]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let feeling = pipeline::analyze_feeling(&client(&server), "so happy")
        .await
        .unwrap();
    assert_eq!(feeling.keywords, vec!["joy"]);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("so happy"));
}

#[tokio::test]
async fn feel_chains_two_upstream_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply(
            r#"Here you go: {"warmth":0.2,"calm":0.9,"energy":0.1,"keywords":["quiet"]} hope it helps"#,
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(reply(
            r#"{"mood":"still","evidence":"quiet","motion":"Drift","params":{"speed":-4}}"#,
        ))
        .mount(&server)
        .await;

    let (feeling, plan) = pipeline::feel(&client(&server), "a quiet night")
        .await
        .unwrap();
    assert_eq!(feeling.keywords, vec!["quiet"]);
    assert_eq!(plan.motion, MotionMode::Drift);
    assert_eq!(plan.mood, "still");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = pipeline::analyze_feeling(&client(&server), "hi")
        .await
        .unwrap_err();
    assert_eq!(err.error_kind(), "malformed_model_output");
}
