//! # skillswap-relay
//!
//! Real-time relay for the SkillSwap platform.
//!
//! This crate provides:
//! - **Authenticated WebSocket connections**: bearer credentials checked
//!   against a revocation list, the user directory and the blocked flag
//!   before the upgrade completes
//! - **Room routing**: personal rooms for chat and notification delivery,
//!   pairwise call rooms for WebRTC signaling
//! - **Call signaling**: offer/answer/ICE relayed to the non-sending peer,
//!   with lifecycle bookkeeping and implicit teardown on connection loss
//! - **Notification fan-out**: durable records in SQLite plus best-effort
//!   live pushes
//! - **Per-IP admission limiting** to protect against reconnect abuse
//!
//! Domain services (swap, rating, report, admin logic) embed this crate:
//! they feed the [`gatekeeper::UserDirectory`] and
//! [`gatekeeper::RevocationList`], and call [`fanout::Notifier::notify`]
//! after their own transactional work completes.

pub mod api;
pub mod call;
pub mod config;
pub mod error;
pub mod fanout;
pub mod gatekeeper;
pub mod limiter;
pub mod registry;
pub mod router;
pub mod ws;

pub use api::AppState;
pub use config::RelayConfig;
pub use error::RelayError;
