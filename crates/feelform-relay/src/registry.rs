//! Room membership bookkeeping.
//!
//! Invariants:
//! - a connection is in at most one room;
//! - a room exists only while it has at least one member.

use std::collections::{HashMap, HashSet};

use feelform_core::ids::{ConnectionId, RoomId};

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    memberships: HashMap<ConnectionId, Option<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection that has not joined any room yet.
    pub fn register(&mut self, conn: ConnectionId) {
        self.memberships.entry(conn).or_insert(None);
    }

    pub fn is_registered(&self, conn: &ConnectionId) -> bool {
        self.memberships.contains_key(conn)
    }

    /// Move `conn` into `room`, leaving its previous room if different.
    /// Returns the room that was left, if any. Unknown connections are
    /// never added.
    pub fn join(&mut self, conn: &ConnectionId, room: &RoomId) -> Option<RoomId> {
        if !self.is_registered(conn) || self.room_of(conn) == Some(room) {
            return None;
        }
        let previous = self.leave(conn);
        self.rooms
            .entry(room.clone())
            .or_default()
            .insert(conn.clone());
        self.memberships.insert(conn.clone(), Some(room.clone()));
        previous
    }

    /// Join `room` unless already in it. Returns `true` if a join happened.
    pub fn ensure_membership(&mut self, conn: &ConnectionId, room: &RoomId) -> bool {
        if !self.is_registered(conn) || self.room_of(conn) == Some(room) {
            false
        } else {
            self.join(conn, room);
            true
        }
    }

    /// Leave the current room, keeping the connection registered.
    pub fn leave(&mut self, conn: &ConnectionId) -> Option<RoomId> {
        let room = self.memberships.get_mut(conn)?.take()?;
        self.remove_member(&room, conn);
        Some(room)
    }

    /// Forget a closed connection. Returns the room it was in.
    pub fn unregister(&mut self, conn: &ConnectionId) -> Option<RoomId> {
        let room = self.memberships.remove(conn)??;
        self.remove_member(&room, conn);
        Some(room)
    }

    fn remove_member(&mut self, room: &RoomId, conn: &ConnectionId) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(conn);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    pub fn room_of(&self, conn: &ConnectionId) -> Option<&RoomId> {
        self.memberships.get(conn).and_then(Option::as_ref)
    }

    /// Snapshot of every member of `room` except `except`.
    pub fn peers(&self, room: &RoomId, except: &ConnectionId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().filter(|c| *c != except).cloned().collect())
            .unwrap_or_default()
    }

    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.memberships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(s: &str) -> RoomId {
        RoomId::parse(s).unwrap()
    }

    fn registered(reg: &mut RoomRegistry) -> ConnectionId {
        let id = ConnectionId::new();
        reg.register(id.clone());
        id
    }

    fn sorted(mut v: Vec<ConnectionId>) -> Vec<ConnectionId> {
        v.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        v
    }

    #[test]
    fn registered_connection_has_no_room() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        assert_eq!(reg.room_of(&a), None);
        assert_eq!(reg.room_count(), 0);
        assert_eq!(reg.connection_count(), 1);
    }

    #[test]
    fn join_creates_room_lazily() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        assert!(!reg.contains_room(&room("42")));
        reg.join(&a, &room("42"));
        assert!(reg.contains_room(&room("42")));
        assert_eq!(reg.members(&room("42")), vec![a.clone()]);
        assert_eq!(reg.room_of(&a), Some(&room("42")));
    }

    #[test]
    fn joining_twice_does_not_duplicate() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        reg.join(&a, &room("r"));
        assert_eq!(reg.join(&a, &room("r")), None);
        assert_eq!(reg.members(&room("r")).len(), 1);
    }

    #[test]
    fn membership_is_exclusive() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        let b = registered(&mut reg);
        reg.join(&a, &room("one"));
        reg.join(&b, &room("one"));

        let left = reg.join(&a, &room("two"));
        assert_eq!(left, Some(room("one")));
        assert_eq!(reg.members(&room("one")), vec![b]);
        assert_eq!(reg.members(&room("two")), vec![a]);
    }

    #[test]
    fn last_member_leaving_removes_room() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        reg.join(&a, &room("solo"));
        reg.join(&a, &room("elsewhere"));
        assert!(!reg.contains_room(&room("solo")));
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn unregister_removes_member_and_empty_room() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        let b = registered(&mut reg);
        reg.join(&a, &room("r"));
        reg.join(&b, &room("r"));

        assert_eq!(reg.unregister(&a), Some(room("r")));
        assert_eq!(reg.members(&room("r")), vec![b.clone()]);
        assert_eq!(reg.room_of(&a), None);

        assert_eq!(reg.unregister(&b), Some(room("r")));
        assert!(!reg.contains_room(&room("r")));
        assert_eq!(reg.room_count(), 0);
        assert_eq!(reg.connection_count(), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        assert_eq!(reg.unregister(&a), None);
        assert_eq!(reg.unregister(&a), None);
    }

    #[test]
    fn ensure_membership_only_joins_once() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        assert!(reg.ensure_membership(&a, &room("x")));
        assert!(!reg.ensure_membership(&a, &room("x")));
        assert!(reg.ensure_membership(&a, &room("y")));
        assert!(!reg.contains_room(&room("x")));
    }

    #[test]
    fn unknown_connection_cannot_join() {
        let mut reg = RoomRegistry::new();
        let a = ConnectionId::new();
        assert_eq!(reg.join(&a, &room("r")), None);
        assert!(!reg.ensure_membership(&a, &room("r")));
        assert_eq!(reg.connection_count(), 0);
        assert!(!reg.contains_room(&room("r")));
    }

    #[test]
    fn unregistered_connection_cannot_rejoin() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        reg.join(&a, &room("r"));
        reg.unregister(&a);

        assert!(!reg.ensure_membership(&a, &room("r")));
        assert_eq!(reg.room_count(), 0);
        assert_eq!(reg.room_of(&a), None);
    }

    #[test]
    fn peers_exclude_sender() {
        let mut reg = RoomRegistry::new();
        let a = registered(&mut reg);
        let b = registered(&mut reg);
        let c = registered(&mut reg);
        let d = registered(&mut reg);
        reg.join(&a, &room("A"));
        reg.join(&b, &room("A"));
        reg.join(&c, &room("A"));
        reg.join(&d, &room("B"));

        assert_eq!(sorted(reg.peers(&room("A"), &a)), sorted(vec![b, c]));
        assert!(reg.peers(&room("B"), &d).is_empty());
        assert!(reg.peers(&room("nowhere"), &a).is_empty());
    }
}
