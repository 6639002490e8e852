//! Typed CRUD helpers for notification records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use skillswap_shared::{NotificationCategory, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::NotificationRecord;

impl Database {
    pub fn insert_notification(&self, record: &NotificationRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (id, user_id, category, message, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.user_id.as_str(),
                record.category.as_str(),
                record.message,
                record.is_read as i64,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_notification(&self, id: Uuid) -> Result<NotificationRecord> {
        self.conn()
            .query_row(
                "SELECT id, user_id, category, message, is_read, created_at
                 FROM notifications WHERE id = ?1",
                params![id.to_string()],
                row_to_notification,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Newest-first page of a user's notifications.
    pub fn get_notifications_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, category, message, is_read, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![user_id.as_str(), limit, offset],
            row_to_notification,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Flip the read flag.  Succeeds only when `caller` owns the record;
    /// anyone else gets [`StoreError::NotAuthorized`] and the flag is left
    /// untouched.
    pub fn mark_notification_read(&self, id: Uuid, caller: &UserId) -> Result<()> {
        let record = self.get_notification(id)?;
        if record.user_id != *caller {
            return Err(StoreError::NotAuthorized);
        }

        self.conn().execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    pub fn unread_count(&self, user_id: &UserId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRecord> {
    let id_str: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let category_str: String = row.get(2)?;
    let message: String = row.get(3)?;
    let is_read: i64 = row.get(4)?;
    let ts_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let category = NotificationCategory::parse(&category_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown notification category: {category_str}").into(),
        )
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(NotificationRecord {
        id,
        user_id: UserId::new(user_id),
        category,
        message,
        is_read: is_read != 0,
        created_at,
    })
}
