use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use feelform_core::errors::GatewayError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// One system + user exchange with the text-generation endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// An external text-generation service returning free-form text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model(&self) -> &str;

    /// Returns the raw assistant content. Interpreting it is the caller's job.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

/// Client for an OpenAI Chat Completions compatible endpoint (or proxy).
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::network)?;

        let status = resp.status();
        let text = resp.text().await.map_err(GatewayError::network)?;
        let data = parse_body(&text);

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "text-generation endpoint returned an error");
            return Err(GatewayError::from_status(status.as_u16(), data));
        }

        Ok(assistant_content(&data).to_owned())
    }
}

/// Bodies that are not JSON are kept verbatim as a string for diagnostics.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

/// `choices[0].message.content`, or empty when the response has no such field.
fn assistant_content(data: &Value) -> &str {
    data.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
}
