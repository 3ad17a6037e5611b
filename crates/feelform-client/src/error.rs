use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Why a single relay session ended abnormally. Every variant leads to a retry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}
