//! Call lifecycle bookkeeping.
//!
//! The state machine is advisory, per-room bookkeeping -- not a lock.  The
//! relay forwards every signaling message to the non-sending peer; what the
//! phases buy us is implicit teardown on connection loss and log visibility
//! into out-of-order signaling.  Transitions are pure functions so they can
//! be tested without a transport.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use skillswap_shared::{CallMedium, RoomId, UserId};

/// Signaling inputs that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    Offer,
    Answer,
    Reject,
    End,
    /// A participant's transport closed while the call was live.
    PeerLost,
}

/// Lifecycle phase of one call attempt in one room.
///
/// Reject, end and peer loss all reset the room to `Idle`; there is no
/// persistent terminal state because a room outlives its call attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallPhase {
    #[default]
    Idle,
    Ringing,
    Active,
}

impl CallPhase {
    /// Advance the phase for one signaling event.
    ///
    /// Out-of-order events leave the phase untouched: the relay never
    /// arbitrates, the receiving peer's application logic does.  `End` is
    /// idempotent so concurrent hang-ups from both sides are harmless.
    pub fn apply(self, event: CallEvent) -> CallPhase {
        match (self, event) {
            (CallPhase::Idle, CallEvent::Offer) => CallPhase::Ringing,
            (CallPhase::Ringing, CallEvent::Answer) => CallPhase::Active,
            (CallPhase::Ringing, CallEvent::Reject) => CallPhase::Idle,
            (_, CallEvent::End) | (_, CallEvent::PeerLost) => CallPhase::Idle,
            (phase, _) => phase,
        }
    }
}

/// Ephemeral state attached to a call room for one call attempt.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub initiator: UserId,
    pub medium: CallMedium,
    pub phase: CallPhase,
}

/// Per-room call sessions.  A room with no entry is idle.
#[derive(Clone, Default)]
pub struct CallBoard {
    sessions: Arc<RwLock<HashMap<RoomId, CallSession>>>,
}

impl CallBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an offer.  A second offer into an already ringing or active
    /// room is logged but not blocked; the callee's client decides what to
    /// do with it.
    pub async fn on_offer(&self, room: &RoomId, initiator: &UserId, medium: CallMedium) {
        let mut sessions = self.sessions.write().await;
        match sessions.get(room) {
            Some(existing) if existing.phase != CallPhase::Idle => {
                warn!(
                    room = %room,
                    phase = ?existing.phase,
                    from = %initiator.short(),
                    "offer into a busy call room (forwarded anyway)"
                );
            }
            _ => {
                info!(room = %room, from = %initiator.short(), medium = %medium, "call ringing");
                sessions.insert(
                    room.clone(),
                    CallSession {
                        initiator: initiator.clone(),
                        medium,
                        phase: CallPhase::Ringing,
                    },
                );
            }
        }
    }

    pub async fn on_answer(&self, room: &RoomId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(room) {
            session.phase = session.phase.apply(CallEvent::Answer);
            if session.phase == CallPhase::Active {
                info!(room = %room, "call active");
            }
        } else {
            debug!(room = %room, "answer for a room with no call session");
        }
    }

    pub async fn on_reject(&self, room: &RoomId) {
        self.finish(room, CallEvent::Reject).await;
    }

    pub async fn on_end(&self, room: &RoomId) {
        self.finish(room, CallEvent::End).await;
    }

    /// Tear down the session after a participant's connection was lost.
    /// Returns `true` when a ringing or active call existed, in which case
    /// the caller forwards an end signal to the remaining peer.
    pub async fn on_peer_lost(&self, room: &RoomId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(room) {
            Some(session) if session.phase != CallPhase::Idle => {
                info!(room = %room, phase = ?session.phase, "call torn down after connection loss");
                true
            }
            _ => false,
        }
    }

    pub async fn phase_of(&self, room: &RoomId) -> CallPhase {
        self.sessions
            .read()
            .await
            .get(room)
            .map(|session| session.phase)
            .unwrap_or_default()
    }

    async fn finish(&self, room: &RoomId, event: CallEvent) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(room) {
            session.phase = session.phase.apply(event);
            if session.phase == CallPhase::Idle {
                sessions.remove(room);
                debug!(room = %room, event = ?event, "call session reset");
            }
        }
        // No session: a duplicate end/reject, harmless by design of apply().
    }
}
