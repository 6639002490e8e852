//! Room routing primitives.
//!
//! Delivery is fire-and-forget: no acknowledgment, no retry, no queueing
//! for offline recipients.  A room with no members is a no-op, not an
//! error.  Call-signaling callers must use the `_except` variant so nothing
//! echoes back to the sender.

use tracing::{debug, trace};

use skillswap_shared::{ConnectionId, RoomId, ServerEvent};

use crate::registry::SessionRegistry;

#[derive(Clone)]
pub struct RoomRouter {
    registry: SessionRegistry,
}

impl RoomRouter {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every live connection in the room.  Returns the
    /// number of connections that accepted it.
    pub async fn send_to_room(&self, room: &RoomId, event: ServerEvent) -> usize {
        self.deliver(room, None, event).await
    }

    /// Deliver `event` to every room member except the sending connection.
    pub async fn send_to_room_except(
        &self,
        room: &RoomId,
        sender: ConnectionId,
        event: ServerEvent,
    ) -> usize {
        self.deliver(room, Some(sender), event).await
    }

    async fn deliver(
        &self,
        room: &RoomId,
        except: Option<ConnectionId>,
        event: ServerEvent,
    ) -> usize {
        let targets = self.registry.senders_for(room, except).await;
        if targets.is_empty() {
            trace!(room = %room, "no live recipients");
            return 0;
        }

        let mut delivered = 0;
        for (conn_id, sender) in targets {
            if sender.try_send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                // Queue full or receiver gone: drop for that connection.
                debug!(room = %room, conn = %conn_id, "dropping event for slow connection");
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_shared::{Identity, UserId};

    #[tokio::test]
    async fn delivers_to_every_member() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new(registry.clone());

        let (tx1, mut rx1) = SessionRegistry::channel();
        let (tx2, mut rx2) = SessionRegistry::channel();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        registry.register(c1, Identity::new("u1", "Alice"), tx1).await;
        registry.register(c2, Identity::new("u1", "Alice"), tx2).await;

        let personal = RoomId::personal(&UserId::new("u1"));
        let event = ServerEvent::ReceiveMessage {
            sender: UserId::new("u2"),
            message: "hi".into(),
        };

        let delivered = router.send_to_room(&personal, event.clone()).await;
        assert_eq!(delivered, 2);
        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn empty_room_is_a_no_op() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new(registry);

        let delivered = router
            .send_to_room(
                &RoomId::new("nobody-home"),
                ServerEvent::ReceiveMessage {
                    sender: UserId::new("u1"),
                    message: "anyone?".into(),
                },
            )
            .await;

        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn except_skips_the_sender() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new(registry.clone());

        let (tx1, mut rx1) = SessionRegistry::channel();
        let (tx2, mut rx2) = SessionRegistry::channel();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        registry.register(c1, Identity::new("u1", "Alice"), tx1).await;
        registry.register(c2, Identity::new("u2", "Bob"), tx2).await;

        let call = RoomId::call_pair(&UserId::new("u1"), &UserId::new("u2"));
        registry.join_room(c1, call.clone()).await;
        registry.join_room(c2, call.clone()).await;

        let event = ServerEvent::CallEnded {
            from: UserId::new("u1"),
        };
        let delivered = router.send_to_room_except(&call, c1, event.clone()).await;

        assert_eq!(delivered, 1);
        assert_eq!(rx2.recv().await.unwrap(), event);
        assert!(rx1.try_recv().is_err());
    }
}
