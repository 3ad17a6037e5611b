use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use feelform_llm::TextGenerator;

use crate::api;
use crate::config::{ConfigError, ServerConfig};
use crate::connection::{self, ConnectionTable};
use crate::hub::{HubEvent, RelayHub, RelayStats};

/// The generator, or the reason it could not be built. Requests that need it
/// report the error instead of the server refusing to start.
pub type GeneratorSlot = Result<Arc<dyn TextGenerator>, ConfigError>;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionTable>,
    pub events: mpsc::Sender<HubEvent>,
    pub stats: Arc<RelayStats>,
    pub generator: GeneratorSlot,
    pub max_message_size: usize,
    pub heartbeat: Duration,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/analyze", post(api::analyze_handler))
        .route("/api/motion-plan", post(api::motion_plan_handler))
        .route("/api/feel", post(api::feel_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind, spawn the hub, liveness sweep and HTTP server. Port 0 picks a free port.
pub async fn start(
    config: ServerConfig,
    generator: GeneratorSlot,
) -> std::io::Result<ServerHandle> {
    let connections = Arc::new(ConnectionTable::new(config.max_send_queue));
    let stats = Arc::new(RelayStats::default());
    let (event_tx, event_rx) = mpsc::channel::<HubEvent>(1024);

    let hub = RelayHub::new(Arc::clone(&connections), Arc::clone(&stats));
    let hub_handle = tokio::spawn(hub.run(event_rx));

    let sweep_handle = connection::start_liveness_sweep(
        Arc::clone(&connections),
        event_tx.clone(),
        config.heartbeat(),
        config.client_timeout(),
    );

    if let Err(e) = &generator {
        tracing::warn!(error = %e, "text generation not configured; analysis endpoints will fail");
    }

    let state = AppState {
        connections,
        events: event_tx,
        stats,
        generator,
        max_message_size: config.max_message_size,
        heartbeat: config.heartbeat(),
    };

    let router = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, "feelform relay started");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
        _hub: hub_handle,
        _sweep: sweep_handle,
    })
}

/// Handle returned by `start()`. Keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
    _hub: tokio::task::JoinHandle<()>,
    _sweep: tokio::task::JoinHandle<()>,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size)
        .max_frame_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn_id, rx) = state.connections.register();
    if state
        .events
        .send(HubEvent::Connected(conn_id.clone()))
        .await
        .is_err()
    {
        state.connections.unregister(&conn_id);
        return;
    }

    connection::handle_ws_connection(
        socket,
        conn_id,
        rx,
        state.connections,
        state.events,
        state.heartbeat,
    )
    .await;
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "connections": state.connections.count(),
        "rooms": state.stats.rooms(),
        "framesRelayed": state.stats.frames_relayed(),
        "framesDropped": state.stats.frames_dropped(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn start_binds_ephemeral_port() {
        let handle = start(test_config(), Err(ConfigError::MissingEndpoint))
            .await
            .unwrap();
        assert_ne!(handle.port, 0);
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let handle = start(test_config(), Err(ConfigError::MissingEndpoint))
            .await
            .unwrap();
        let body: serde_json::Value =
            reqwest::get(format!("http://127.0.0.1:{}/health", handle.port))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);
        assert_eq!(body["rooms"], 0);
        assert_eq!(body["framesRelayed"], 0);
        assert_eq!(body["framesDropped"], 0);
    }
}
