use serde_json::Value;

/// Failures of the external text-generation endpoint.
/// None of them are retried.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    /// Endpoint unreachable, or it answered with a non-success status.
    #[error("upstream unavailable: {detail}")]
    UpstreamUnavailable { status: Option<u16>, detail: Value },

    /// Endpoint answered, but no JSON object could be extracted from the content.
    #[error("model output was not valid JSON")]
    MalformedModelOutput { raw: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Classify a non-success HTTP response from the endpoint.
    pub fn from_status(status: u16, body: Value) -> Self {
        Self::UpstreamUnavailable {
            status: Some(status),
            detail: body,
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            status: None,
            detail: Value::String(err.to_string()),
        }
    }

    pub fn malformed(raw: impl Into<String>) -> Self {
        Self::MalformedModelOutput { raw: raw.into() }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::MalformedModelOutput { .. } => "malformed_model_output",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// HTTP status used when this error is surfaced to an API caller.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UpstreamUnavailable { .. } => 503,
            Self::MalformedModelOutput { .. } => 502,
            Self::InvalidRequest(_) => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_status_keeps_body() {
        let err = GatewayError::from_status(429, json!({"error": "slow down"}));
        match err {
            GatewayError::UpstreamUnavailable { status, detail } => {
                assert_eq!(status, Some(429));
                assert_eq!(detail["error"], "slow down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn network_error_has_no_status() {
        let err = GatewayError::network("connection refused");
        assert!(matches!(err, GatewayError::UpstreamUnavailable { status: None, .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn statuses_are_distinct() {
        let upstream = GatewayError::network("down");
        let malformed = GatewayError::malformed("sorry");
        assert_eq!(upstream.http_status(), 503);
        assert_eq!(malformed.http_status(), 502);
        assert_eq!(GatewayError::InvalidRequest("x".into()).http_status(), 400);
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(GatewayError::malformed("").error_kind(), "malformed_model_output");
        assert_eq!(GatewayError::network("").error_kind(), "upstream_unavailable");
        assert_eq!(
            GatewayError::InvalidRequest("x".into()).error_kind(),
            "invalid_request"
        );
    }
}
