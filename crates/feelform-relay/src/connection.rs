use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use feelform_core::ids::ConnectionId;

use crate::hub::HubEvent;

/// Outbound side of one relay connection.
pub struct Connection {
    tx: mpsc::Sender<String>,
    open: AtomicBool,
    last_seen: AtomicU64,
}

impl Connection {
    fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            open: AtomicBool::new(true),
            last_seen: AtomicU64::new(now_secs()),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed) && !self.tx.is_closed()
    }

    fn touch(&self) {
        self.last_seen.store(now_secs(), Ordering::Relaxed);
    }

    fn is_alive(&self, timeout: Duration) -> bool {
        let last = self.last_seen.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < timeout.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// All live transport handles, keyed by connection id.
pub struct ConnectionTable {
    conns: DashMap<ConnectionId, Arc<Connection>>,
    max_send_queue: usize,
}

impl ConnectionTable {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            conns: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new connection and return its id plus the outbound queue.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.conns.insert(id.clone(), Arc::new(Connection::new(tx)));
        (id, rx)
    }

    /// Drop a connection. Its outbound queue closes once the last sender is gone.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        match self.conns.remove(id) {
            Some((_, conn)) => {
                conn.open.store(false, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Best-effort send. A connection that is closed or whose queue is full
    /// is skipped and left in place.
    pub fn try_send(&self, id: &ConnectionId, frame: String) -> bool {
        let Some(conn) = self.conns.get(id) else {
            return false;
        };
        if !conn.is_open() {
            return false;
        }
        match conn.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                tracing::debug!(conn_id = %id, frame_len = frame.len(), "send queue full, skipping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Record inbound activity (frame or pong) for liveness.
    pub fn touch(&self, id: &ConnectionId) {
        if let Some(conn) = self.conns.get(id) {
            conn.touch();
        }
    }

    fn mark_closed(&self, id: &ConnectionId) {
        if let Some(conn) = self.conns.get(id) {
            conn.open.store(false, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> usize {
        self.conns.len()
    }

    /// Remove connections with no inbound activity within `timeout`.
    pub fn reap_dead(&self, timeout: Duration) -> Vec<ConnectionId> {
        let dead: Vec<ConnectionId> = self
            .conns
            .iter()
            .filter(|entry| !entry.value().is_alive(timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &dead {
            self.unregister(id);
        }
        dead
    }
}

/// Drive one WebSocket: forward inbound text frames to the hub and drain the
/// outbound queue, pinging every `heartbeat`.
pub async fn handle_ws_connection(
    socket: WebSocket,
    conn_id: ConnectionId,
    mut rx: mpsc::Receiver<String>,
    table: Arc<ConnectionTable>,
    events: mpsc::Sender<HubEvent>,
    heartbeat: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_id = conn_id.clone();
    let writer_table = Arc::clone(&table);
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                    tracing::trace!(conn_id = %writer_id, "sent ping");
                }
            }
        }
        writer_table.mark_closed(&writer_id);
        let _ = ws_tx.close().await;
    });

    let reader_id = conn_id.clone();
    let reader_table = Arc::clone(&table);
    let reader_events = events.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    reader_table.touch(&reader_id);
                    let event = HubEvent::Frame(reader_id.clone(), text.to_string());
                    if reader_events.send(event).await.is_err() {
                        break;
                    }
                }
                WsMessage::Pong(_) => reader_table.touch(&reader_id),
                WsMessage::Binary(data) => {
                    tracing::debug!(conn_id = %reader_id, len = data.len(), "ignoring binary frame");
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {}
            }
        }
    });

    // The aborted task must be finished before `Closed` is queued, or a
    // late `Frame` from the reader could land behind it.
    tokio::select! {
        _ = &mut writer => {
            reader.abort();
            let _ = reader.await;
        }
        _ = &mut reader => {
            writer.abort();
            let _ = writer.await;
        }
    }

    table.unregister(&conn_id);
    let _ = events.send(HubEvent::Closed(conn_id.clone())).await;
    tracing::info!(conn_id = %conn_id, "connection closed");
}

/// Periodically close connections that stopped answering pings, and route
/// them through the hub's close handling so their rooms are cleaned up.
pub fn start_liveness_sweep(
    table: Arc<ConnectionTable>,
    events: mpsc::Sender<HubEvent>,
    interval: Duration,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for id in table.reap_dead(timeout) {
                tracing::info!(conn_id = %id, "reaped unresponsive connection");
                if events.send(HubEvent::Closed(id)).await.is_err() {
                    return;
                }
            }
        }
    })
}
