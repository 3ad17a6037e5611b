//! Server and LLM configuration with environment overrides.
//!
//! Overrides are parsed strictly: a value that does not parse or is out of
//! range is logged and ignored, leaving the default in place.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use feelform_llm::provider::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use feelform_llm::{ChatCompletionsClient, TextGenerator};

/// Required LLM settings that are missing. Surfaced per request, not at startup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_ENDPOINT is not set")]
    MissingEndpoint,
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_send_queue: usize,
    pub max_message_size: usize,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_send_queue: 64,
            max_message_size: 64 * 1024,
            heartbeat_interval_secs: 30,
            client_timeout_secs: 90,
        }
    }
}

impl ServerConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl LlmConfig {
    /// Build the upstream client, or report which setting is missing.
    pub fn build_generator(&self) -> Result<Arc<dyn TextGenerator>, ConfigError> {
        let endpoint = self.endpoint.clone().ok_or(ConfigError::MissingEndpoint)?;
        let api_key = self.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        let client = ChatCompletionsClient::new(endpoint, api_key)
            .with_model(self.model.clone())
            .with_temperature(self.temperature);
        Ok(Arc::new(client))
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Defaults plus process environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = EnvReader { lookup };

        // ── Server ──────────────────────────────────────────────────
        if let Some(v) = env.u16("PORT", 1, 65535) {
            self.server.port = v;
        }
        if let Some(v) = env.string("FEELFORM_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env.u64("FEELFORM_MAX_SEND_QUEUE", 1, 65_536) {
            self.server.max_send_queue = v as usize;
        }
        if let Some(v) = env.u64("FEELFORM_HEARTBEAT_SECS", 1, 3600) {
            self.server.heartbeat_interval_secs = v;
        }
        if let Some(v) = env.u64("FEELFORM_CLIENT_TIMEOUT_SECS", 1, 86_400) {
            self.server.client_timeout_secs = v;
        }

        // ── LLM ─────────────────────────────────────────────────────
        if let Some(v) = env.string("OPENAI_API_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = env.string("OPENAI_API_KEY") {
            self.llm.api_key = Some(SecretString::from(v));
        }
        if let Some(v) = env.string("FEELFORM_MODEL") {
            self.llm.model = v;
        }
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = val.parse::<u16>().ok().filter(|n| (min..=max).contains(n));
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = val.parse::<u64>().ok().filter(|n| (min..=max).contains(n));
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}
