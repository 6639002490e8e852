//! # skillswap-shared
//!
//! Types shared between the relay and anything that talks to it: identity
//! and room newtypes, and the JSON wire protocol spoken over the WebSocket.

pub mod protocol;
pub mod types;

pub use protocol::{ClientEvent, ServerEvent};
pub use types::{CallMedium, ConnectionId, Identity, NotificationCategory, RoomId, UserId};
