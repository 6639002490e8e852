//! Persisted domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillswap_shared::{NotificationCategory, UserId};

/// A durable notification.
///
/// Created with `is_read = false` by the fan-out layer; the only mutation
/// ever applied is flipping the read flag, and only by the owning user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The user this notification is addressed to.
    pub user_id: UserId,
    /// Notification category.
    pub category: NotificationCategory,
    /// Human-readable message text.
    pub message: String,
    /// Whether the owner has read the notification.
    pub is_read: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Build a fresh, unread record.
    pub fn new(user_id: UserId, category: NotificationCategory, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category,
            message: message.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
