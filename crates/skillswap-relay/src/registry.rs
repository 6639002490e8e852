//! Session registry: connection <-> identity <-> room membership.
//!
//! The membership tables here are the only shared mutable state in the
//! relay.  All mutation happens behind one `RwLock`; routing takes a read
//! lock, clones the relevant senders, and delivers outside the lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use skillswap_shared::{ConnectionId, Identity, RoomId, ServerEvent, UserId};

/// Outbound queue handle for one connection.
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Capacity of each connection's outbound queue.  A connection that falls
/// this far behind starts losing events (at-most-once delivery).
const OUTBOUND_QUEUE: usize = 256;

struct ConnectionEntry {
    identity: Identity,
    sender: EventSender,
    rooms: HashSet<RoomId>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

/// Cloneable handle to the registry.  Constructed once at startup and passed
/// to every component that routes messages.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the outbound channel pair for a new connection.
    pub fn channel() -> (EventSender, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(OUTBOUND_QUEUE)
    }

    /// Add a connection under its identity and auto-join its personal room.
    /// Idempotent per connection id.
    pub async fn register(&self, conn_id: ConnectionId, identity: Identity, sender: EventSender) {
        let mut inner = self.inner.write().await;
        if inner.connections.contains_key(&conn_id) {
            return;
        }

        let personal = RoomId::personal(&identity.id);
        inner.rooms.entry(personal.clone()).or_default().insert(conn_id);

        info!(
            conn = %conn_id,
            user = %identity.id.short(),
            total = inner.connections.len() + 1,
            "connection registered"
        );

        inner.connections.insert(
            conn_id,
            ConnectionEntry {
                identity,
                sender,
                rooms: HashSet::from([personal]),
            },
        );
    }

    /// Add the connection to a room.  Returns `false` for unknown
    /// connections (already deregistered).
    pub async fn join_room(&self, conn_id: ConnectionId, room: RoomId) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(entry) = inner.connections.get_mut(&conn_id) else {
            return false;
        };

        debug!(conn = %conn_id, room = %room, "joining room");
        entry.rooms.insert(room.clone());
        inner.rooms.entry(room).or_default().insert(conn_id);
        true
    }

    pub async fn leave_room(&self, conn_id: ConnectionId, room: &RoomId) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(entry) = inner.connections.get_mut(&conn_id) {
            entry.rooms.remove(room);
        }
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
    }

    /// Remove the connection from every room it had joined.
    ///
    /// Returns the rooms it was a member of so the caller can fire implicit
    /// call teardown.  After this completes no room holds a reference to
    /// the connection.
    pub async fn deregister(&self, conn_id: ConnectionId) -> Vec<RoomId> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(entry) = inner.connections.remove(&conn_id) else {
            return Vec::new();
        };

        let mut left = Vec::with_capacity(entry.rooms.len());
        for room in entry.rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(&conn_id);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
            left.push(room);
        }

        info!(
            conn = %conn_id,
            user = %entry.identity.id.short(),
            remaining = inner.connections.len(),
            "connection deregistered"
        );

        left
    }

    /// Current live members of a room.  An empty vec is a valid, non-error
    /// result.
    pub async fn members_of(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn identity_of(&self, conn_id: ConnectionId) -> Option<Identity> {
        self.inner
            .read()
            .await
            .connections
            .get(&conn_id)
            .map(|entry| entry.identity.clone())
    }

    /// Number of live connections a user currently holds.
    pub async fn connections_of(&self, user: &UserId) -> usize {
        self.inner
            .read()
            .await
            .connections
            .values()
            .filter(|entry| entry.identity.id == *user)
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Snapshot the outbound senders of a room, optionally excluding one
    /// connection (the sender of a signaling message).
    pub(crate) async fn senders_for(
        &self,
        room: &RoomId,
        except: Option<ConnectionId>,
    ) -> Vec<(ConnectionId, EventSender)> {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return Vec::new();
        };

        members
            .iter()
            .filter(|id| Some(**id) != except)
            .filter_map(|id| {
                inner
                    .connections
                    .get(id)
                    .map(|entry| (*id, entry.sender.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> Identity {
        Identity::new(id, format!("User {id}"))
    }

    #[tokio::test]
    async fn register_auto_joins_personal_room() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = SessionRegistry::channel();

        registry.register(conn, identity("u1"), tx).await;

        let personal = RoomId::personal(&UserId::new("u1"));
        assert_eq!(registry.members_of(&personal).await, vec![conn]);
    }

    #[tokio::test]
    async fn register_is_idempotent_per_connection() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let (tx1, _rx1) = SessionRegistry::channel();
        let (tx2, _rx2) = SessionRegistry::channel();

        registry.register(conn, identity("u1"), tx1).await;
        registry.register(conn, identity("u1"), tx2).await;

        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn deregister_removes_every_membership() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = SessionRegistry::channel();

        registry.register(conn, identity("u1"), tx).await;
        let call = RoomId::call_pair(&UserId::new("u1"), &UserId::new("u2"));
        registry.join_room(conn, call.clone()).await;

        let left = registry.deregister(conn).await;
        assert_eq!(left.len(), 2);

        // No dangling membership anywhere.
        assert!(registry.members_of(&call).await.is_empty());
        assert!(registry
            .members_of(&RoomId::personal(&UserId::new("u1")))
            .await
            .is_empty());
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn join_after_deregister_is_refused() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = SessionRegistry::channel();

        registry.register(conn, identity("u1"), tx).await;
        registry.deregister(conn).await;

        let room = RoomId::new("u1_u2");
        assert!(!registry.join_room(conn, room.clone()).await);
        assert!(registry.members_of(&room).await.is_empty());
    }

    #[tokio::test]
    async fn two_connections_share_a_personal_room() {
        let registry = SessionRegistry::new();
        let (tx1, _rx1) = SessionRegistry::channel();
        let (tx2, _rx2) = SessionRegistry::channel();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        registry.register(c1, identity("u1"), tx1).await;
        registry.register(c2, identity("u1"), tx2).await;

        let personal = RoomId::personal(&UserId::new("u1"));
        assert_eq!(registry.members_of(&personal).await.len(), 2);
        assert_eq!(registry.connections_of(&UserId::new("u1")).await, 2);

        // Losing one tab leaves the other reachable.
        registry.deregister(c1).await;
        assert_eq!(registry.members_of(&personal).await, vec![c2]);
    }

    #[tokio::test]
    async fn leave_room_keeps_other_memberships() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = SessionRegistry::channel();

        registry.register(conn, identity("u1"), tx).await;
        let call = RoomId::new("u1_u2");
        registry.join_room(conn, call.clone()).await;
        registry.leave_room(conn, &call).await;

        assert!(registry.members_of(&call).await.is_empty());
        assert_eq!(
            registry
                .members_of(&RoomId::personal(&UserId::new("u1")))
                .await
                .len(),
            1
        );
    }
}
