//! v001 -- Initial schema creation.
//!
//! Creates the `notifications` table: the durable side of the fan-out
//! contract.  Records are created by domain collaborators, flipped to read
//! by their owner, and never deleted by this layer.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id    TEXT NOT NULL,               -- target identity
    category   TEXT NOT NULL,               -- swap | chat | rating | admin | system
    message    TEXT NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    created_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_created
    ON notifications(user_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
