//! Notification fan-out.
//!
//! Domain collaborators (swap, rating, report, admin logic) call
//! [`Notifier::notify`] after their own transactional work completes.  The
//! durable write must succeed or the caller hears about it; the live push
//! is strictly additive and never fails the surrounding operation.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use skillswap_shared::{NotificationCategory, RoomId, ServerEvent, UserId};
use skillswap_store::{Database, NotificationRecord, StoreError};

use crate::router::RoomRouter;

#[derive(Clone)]
pub struct Notifier {
    db: Arc<Mutex<Database>>,
    router: RoomRouter,
}

impl Notifier {
    pub fn new(db: Arc<Mutex<Database>>, router: RoomRouter) -> Self {
        Self { db, router }
    }

    /// Run one store operation on the blocking pool so a slow disk write
    /// never stalls the relay's event loop.
    async fn with_db<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.db.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || op(&guard))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Persist a notification record, then push a best-effort live copy to
    /// the target's personal room.
    ///
    /// A storage failure propagates; zero live recipients does not.
    pub async fn notify(
        &self,
        target: &UserId,
        category: NotificationCategory,
        message: &str,
    ) -> Result<NotificationRecord, StoreError> {
        let record = NotificationRecord::new(target.clone(), category, message);
        let stored = record.clone();
        self.with_db(move |db| db.insert_notification(&stored)).await?;

        let event = ServerEvent::ReceiveNotification {
            category,
            message: message.to_string(),
            sender: None,
            timestamp: record.created_at,
        };
        let delivered = self
            .router
            .send_to_room(&RoomId::personal(target), event)
            .await;
        debug!(
            user = %target.short(),
            category = %category,
            delivered,
            "notification fanned out"
        );

        Ok(record)
    }

    /// Flip the read flag; only the record's owner may do so.
    pub async fn mark_read(&self, id: Uuid, caller: &UserId) -> Result<(), StoreError> {
        let caller = caller.clone();
        self.with_db(move |db| db.mark_notification_read(id, &caller))
            .await
    }

    /// Newest-first page of a user's notifications.
    pub async fn notifications_for(
        &self,
        user: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let user = user.clone();
        self.with_db(move |db| db.get_notifications_for_user(&user, limit, offset))
            .await
    }

    pub async fn unread_count(&self, user: &UserId) -> Result<u32, StoreError> {
        let user = user.clone();
        self.with_db(move |db| db.unread_count(&user)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionRegistry;
    use skillswap_shared::{ConnectionId, Identity};

    fn notifier(registry: &SessionRegistry) -> Notifier {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        Notifier::new(db, RoomRouter::new(registry.clone()))
    }

    #[tokio::test]
    async fn notify_persists_even_with_no_recipients() {
        let registry = SessionRegistry::new();
        let notifier = notifier(&registry);
        let target = UserId::new("offline-user");

        // Nobody connected: the durable record is the guarantee.
        let record = notifier
            .notify(&target, NotificationCategory::Swap, "New swap request")
            .await
            .unwrap();

        let page = notifier.notifications_for(&target, 10, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, record.id);
        assert!(!page[0].is_read);
    }

    #[tokio::test]
    async fn notify_reaches_every_open_tab_once() {
        let registry = SessionRegistry::new();
        let notifier = notifier(&registry);
        let target = UserId::new("u1");

        let (tx1, mut rx1) = SessionRegistry::channel();
        let (tx2, mut rx2) = SessionRegistry::channel();
        registry
            .register(ConnectionId::new(), Identity::new("u1", "Alice"), tx1)
            .await;
        registry
            .register(ConnectionId::new(), Identity::new("u1", "Alice"), tx2)
            .await;

        notifier
            .notify(&target, NotificationCategory::Rating, "You got 5 stars")
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                ServerEvent::ReceiveNotification {
                    category, message, ..
                } => {
                    assert_eq!(category, NotificationCategory::Rating);
                    assert_eq!(message, "You got 5 stars");
                }
                other => panic!("unexpected event: {other:?}"),
            }
            // Exactly once per tab.
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn concurrent_notifies_all_persist() {
        let registry = SessionRegistry::new();
        let notifier = notifier(&registry);
        let target = UserId::new("u1");

        // Writes are serialized through the store handle but run off the
        // async executor; a burst of concurrent callers must all land.
        let mut tasks = Vec::new();
        for i in 0..8 {
            let notifier = notifier.clone();
            let target = target.clone();
            tasks.push(tokio::spawn(async move {
                notifier
                    .notify(&target, NotificationCategory::Swap, &format!("event {i}"))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(notifier.unread_count(&target).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn notify_then_mark_read_round_trip() {
        let registry = SessionRegistry::new();
        let notifier = notifier(&registry);
        let owner = UserId::new("u1");
        let stranger = UserId::new("u2");

        let record = notifier
            .notify(&owner, NotificationCategory::Swap, "msg")
            .await
            .unwrap();

        // A stranger cannot flip the flag.
        assert!(matches!(
            notifier.mark_read(record.id, &stranger).await,
            Err(StoreError::NotAuthorized)
        ));
        assert_eq!(notifier.unread_count(&owner).await.unwrap(), 1);

        notifier.mark_read(record.id, &owner).await.unwrap();
        assert_eq!(notifier.unread_count(&owner).await.unwrap(), 0);
    }
}
