//! Single-writer relay loop.
//!
//! Every connection lifecycle event and inbound frame is funneled through one
//! task that owns the `RoomRegistry`, so membership changes and broadcasts
//! never interleave. Sends are best-effort: a recipient whose queue is full
//! or closed is skipped and stays in its room until its own close event.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use feelform_core::ids::{ConnectionId, RoomId};
use feelform_core::messages::{parse_message, Message};

use crate::connection::ConnectionTable;
use crate::registry::RoomRegistry;

#[derive(Debug)]
pub enum HubEvent {
    Connected(ConnectionId),
    Frame(ConnectionId, String),
    Closed(ConnectionId),
}

/// Counters readable from outside the hub task.
#[derive(Debug, Default)]
pub struct RelayStats {
    rooms: AtomicUsize,
    frames_relayed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl RelayStats {
    pub fn rooms(&self) -> usize {
        self.rooms.load(Ordering::Relaxed)
    }

    /// Frames delivered to at least the queue of one peer.
    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }

    /// Inbound frames that failed to decode.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}

pub struct RelayHub {
    registry: RoomRegistry,
    connections: Arc<ConnectionTable>,
    stats: Arc<RelayStats>,
}

impl RelayHub {
    pub fn new(connections: Arc<ConnectionTable>, stats: Arc<RelayStats>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            connections,
            stats,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn on_connect(&mut self, conn: ConnectionId) {
        tracing::info!(conn_id = %conn, "client connected");
        self.registry.register(conn);
    }

    pub fn on_message(&mut self, conn: &ConnectionId, raw: &str) {
        if !self.registry.is_registered(conn) {
            tracing::debug!(conn_id = %conn, "dropping frame from closed connection");
            return;
        }
        let Some(msg) = parse_message(raw) else {
            tracing::trace!(conn_id = %conn, len = raw.len(), "dropping undecodable frame");
            self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match msg {
            Message::Join { ref room, ref role } => {
                if let Some(left) = self.registry.join(conn, room) {
                    tracing::debug!(conn_id = %conn, room = %left, "left room");
                }
                tracing::info!(conn_id = %conn, room = %room, role = role.as_deref().unwrap_or("-"), "joined room");
                let room = room.clone();
                self.broadcast(&room, &Message::joined(room.clone()), conn);
            }
            Message::Hello { ref room } | Message::Tilt { ref room, .. } => {
                if self.registry.ensure_membership(conn, room) {
                    tracing::debug!(conn_id = %conn, room = %room, kind = msg.kind(), "implicit join");
                }
                let room = room.clone();
                self.broadcast(&room, &msg, conn);
            }
            Message::Status { .. } => {}
        }
    }

    pub fn on_close(&mut self, conn: &ConnectionId) {
        if let Some(room) = self.registry.unregister(conn) {
            tracing::debug!(conn_id = %conn, room = %room, "removed from room");
        }
    }

    /// Queue `msg` for every member of `room` except the sender.
    /// Returns the number of peers it was queued for.
    pub fn broadcast(&self, room: &RoomId, msg: &Message, except: &ConnectionId) -> usize {
        let frame = match msg.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode frame");
                return 0;
            }
        };

        let peers = self.registry.peers(room, except);
        let delivered = peers
            .iter()
            .filter(|peer| self.connections.try_send(peer, frame.clone()))
            .count();

        if delivered > 0 {
            self.stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(room = %room, kind = msg.kind(), peers = peers.len(), delivered, "broadcast");
        delivered
    }

    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected(conn) => self.on_connect(conn),
            HubEvent::Frame(conn, raw) => self.on_message(&conn, &raw),
            HubEvent::Closed(conn) => self.on_close(&conn),
        }
        self.stats
            .rooms
            .store(self.registry.room_count(), Ordering::Relaxed);
    }

    /// Drain events until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<HubEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        tracing::debug!("relay hub stopped");
    }
}
