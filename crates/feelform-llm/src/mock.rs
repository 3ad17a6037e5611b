use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use feelform_core::errors::GatewayError;

use crate::provider::{CompletionRequest, TextGenerator};

/// Pre-programmed responses for deterministic testing without HTTP calls.
pub enum MockResponse {
    /// Return this text as the assistant content.
    Text(String),
    /// Fail the call.
    Error(GatewayError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Generator that replays queued responses in order and records requests.
pub struct MockGenerator {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockGenerator {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        let next = self.responses.lock().pop_front();
        let Some(mut response) = next else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockGenerator: no response configured for call {call}"
            )));
        };

        loop {
            match response {
                MockResponse::Text(text) => return Ok(text),
                MockResponse::Error(e) => return Err(e),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    response = *inner;
                }
            }
        }
    }
}
