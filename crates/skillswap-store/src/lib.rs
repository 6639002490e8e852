//! # skillswap-store
//!
//! SQLite persistence for notification records.
//!
//! The relay treats live delivery as best-effort; the durable guarantee of a
//! notification is the record written here.  The crate exposes a synchronous
//! [`Database`] handle wrapping a `rusqlite::Connection` with typed CRUD
//! helpers and versioned migrations.

pub mod database;
pub mod migrations;
pub mod models;
pub mod notifications;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::NotificationRecord;
