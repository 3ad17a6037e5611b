//! Reconnection agent.
//!
//! `Disconnected -> Connecting -> Joined -> Disconnected`, forever. Every
//! successful connect re-sends `join`; every failure waits a fixed delay
//! before the next attempt, with no backoff growth and no retry cap.

use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::{CancellationToken, DropGuard};

use feelform_core::ids::RoomId;
use feelform_core::messages::{parse_server_message, Message};

use crate::error::TransportError;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);
/// Upper bound on the TCP connect plus WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Viewer,
    Controller,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Controller => "controller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub url: String,
    pub room: RoomId,
    pub role: Role,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, room: RoomId) -> Self {
        Self {
            url: url.into(),
            room,
            role: Role::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn join_frame(&self) -> Result<String, serde_json::Error> {
        Message::Join {
            room: self.room.clone(),
            role: Some(self.role.as_str().to_owned()),
        }
        .to_frame()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Joined,
}

/// Last known device tilt. Later values overwrite earlier ones.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
}

/// Owner side of a running agent. Dropping it stops the agent.
pub struct ClientHandle {
    state: watch::Receiver<ConnectionState>,
    orientation: watch::Receiver<Orientation>,
    outbound: watch::Sender<Option<Orientation>>,
    cancel_on_drop: DropGuard,
    task: JoinHandle<()>,
}

impl ClientHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn orientation(&self) -> Orientation {
        *self.orientation.borrow()
    }

    pub fn watch_orientation(&self) -> watch::Receiver<Orientation> {
        self.orientation.clone()
    }

    /// Publish a tilt for the room. Only the latest value is kept, and a
    /// value published while disconnected is not replayed after reconnecting.
    pub fn send_tilt(&self, x: f64, y: f64) {
        self.outbound.send_replace(Some(Orientation { x, y }));
    }

    /// Stop retrying, close the active connection and wait for the loop to exit.
    pub async fn shutdown(self) {
        drop(self.cancel_on_drop);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "relay client task failed");
        }
    }
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    orientation: watch::Sender<Orientation>,
    outbound: watch::Receiver<Option<Orientation>>,
    cancel: CancellationToken,
}

enum SessionEnd {
    /// The relay closed the connection.
    Closed,
    /// Shutdown was requested or the handle was dropped.
    Stopped,
}

/// Start the agent on the current runtime.
pub fn spawn(config: ClientConfig) -> ClientHandle {
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (orientation_tx, orientation_rx) = watch::channel(Orientation::default());
    let (outbound_tx, outbound_rx) = watch::channel(None);
    let cancel = CancellationToken::new();

    let shared = Shared {
        state: state_tx,
        orientation: orientation_tx,
        outbound: outbound_rx,
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(run(config, shared));

    ClientHandle {
        state: state_rx,
        orientation: orientation_rx,
        outbound: outbound_tx,
        cancel_on_drop: cancel.drop_guard(),
        task,
    }
}

async fn run(config: ClientConfig, mut shared: Shared) {
    loop {
        shared.state.send_replace(ConnectionState::Connecting);
        tracing::debug!(url = %config.url, room = %config.room, "connecting to relay");

        let end = session(&config, &mut shared).await;
        shared.state.send_replace(ConnectionState::Disconnected);

        match end {
            Ok(SessionEnd::Stopped) => break,
            Ok(SessionEnd::Closed) => {
                tracing::info!(room = %config.room, "relay closed connection")
            }
            Err(e) => tracing::warn!(error = %e, "relay connection failed"),
        }

        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = tokio::time::sleep(config.retry_delay) => {}
        }
    }
    tracing::debug!(room = %config.room, "relay client stopped");
}

async fn session(config: &ClientConfig, shared: &mut Shared) -> Result<SessionEnd, TransportError> {
    let connect = tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str()));
    let (ws, _response) = tokio::select! {
        _ = shared.cancel.cancelled() => return Ok(SessionEnd::Stopped),
        result = connect => {
            result.map_err(|_| TransportError::ConnectTimeout(config.connect_timeout))??
        }
    };
    let (mut sink, mut stream) = ws.split();

    sink.send(WsMessage::Text(config.join_frame()?.into())).await?;
    // Anything published while disconnected is stale.
    let _ = shared.outbound.borrow_and_update();
    shared.state.send_replace(ConnectionState::Joined);
    tracing::info!(room = %config.room, role = %config.role, "joined room");

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => {
                let _ = sink.close().await;
                return Ok(SessionEnd::Stopped);
            }
            changed = shared.outbound.changed() => {
                if changed.is_err() {
                    let _ = sink.close().await;
                    return Ok(SessionEnd::Stopped);
                }
                let latest = *shared.outbound.borrow_and_update();
                if let Some(Orientation { x, y }) = latest {
                    let frame = Message::Tilt { room: config.room.clone(), x, y }.to_frame()?;
                    sink.send(WsMessage::Text(frame.into())).await?;
                }
            }
            msg = stream.next() => {
                let Some(msg) = msg else { return Ok(SessionEnd::Closed) };
                match msg? {
                    WsMessage::Text(text) => handle_frame(&text, shared),
                    WsMessage::Close(_) => return Ok(SessionEnd::Closed),
                    _ => {}
                }
            }
        }
    }
}

fn handle_frame(raw: &str, shared: &Shared) {
    match parse_server_message(raw) {
        Some(Message::Tilt { x, y, .. }) => {
            shared.orientation.send_replace(Orientation { x, y });
        }
        Some(Message::Status { message, .. }) => {
            tracing::debug!(status = %message, "relay status");
        }
        Some(_) => {}
        None => tracing::trace!(len = raw.len(), "ignoring undecodable frame"),
    }
}
