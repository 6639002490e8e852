//! JSON wire protocol spoken over the WebSocket.
//!
//! Every frame is a text message of the shape `{"event": <name>, "data":
//! {...}}`.  Client frames the relay cannot parse are logged and dropped --
//! this is a best-effort relay, not a validating protocol endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CallMedium, NotificationCategory, RoomId, UserId};

/// Frames sent by a client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join the caller's personal room (chat + notification address).
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { room_id: RoomId },

    /// Join a pairwise call room ahead of signaling.
    #[serde(rename = "join-call", rename_all = "camelCase")]
    JoinCall { room_id: RoomId },

    /// SDP offer: starts ringing the other member of the call room.
    #[serde(rename = "offer", rename_all = "camelCase")]
    Offer {
        room_id: RoomId,
        offer: Value,
        call_type: CallMedium,
    },

    /// SDP answer from the callee.
    #[serde(rename = "answer", rename_all = "camelCase")]
    Answer { room_id: RoomId, answer: Value },

    /// Trickle ICE candidate, forwarded as-is.
    #[serde(rename = "ice-candidate", rename_all = "camelCase")]
    IceCandidate { room_id: RoomId, candidate: Value },

    /// Callee declines a ringing call.
    #[serde(rename = "call-rejected", rename_all = "camelCase")]
    CallRejected { room_id: RoomId },

    /// Either side hangs up.
    #[serde(rename = "call-ended", rename_all = "camelCase")]
    CallEnded { room_id: RoomId },

    /// Direct chat message, delivered to the receiver's personal room.
    #[serde(rename = "sendMessage", rename_all = "camelCase")]
    SendMessage { receiver_id: UserId, message: String },

    /// Live-only system notification push (no durable record).
    #[serde(rename = "sendNotification", rename_all = "camelCase")]
    SendNotification { user_id: UserId, message: String },
}

/// Frames sent by the relay to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "offer", rename_all = "camelCase")]
    Offer {
        offer: Value,
        from: UserId,
        call_type: CallMedium,
    },

    #[serde(rename = "answer", rename_all = "camelCase")]
    Answer { answer: Value, from: UserId },

    #[serde(rename = "ice-candidate", rename_all = "camelCase")]
    IceCandidate { candidate: Value, from: UserId },

    #[serde(rename = "call-rejected", rename_all = "camelCase")]
    CallRejected { from: UserId },

    #[serde(rename = "call-ended", rename_all = "camelCase")]
    CallEnded { from: UserId },

    #[serde(rename = "receiveMessage", rename_all = "camelCase")]
    ReceiveMessage { sender: UserId, message: String },

    #[serde(rename = "receiveNotification", rename_all = "camelCase")]
    ReceiveNotification {
        category: NotificationCategory,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender: Option<UserId>,
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offer_frame() {
        let text = r#"{
            "event": "offer",
            "data": {
                "roomId": "u1_u2",
                "offer": {"type": "offer", "sdp": "v=0"},
                "callType": "video"
            }
        }"#;

        let event = ClientEvent::from_json(text).unwrap();
        match event {
            ClientEvent::Offer {
                room_id, call_type, ..
            } => {
                assert_eq!(room_id.as_str(), "u1_u2");
                assert_eq!(call_type, CallMedium::Video);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn parses_kebab_case_event_names() {
        let text = r#"{"event": "ice-candidate", "data": {"roomId": "a_b", "candidate": {}}}"#;
        assert!(matches!(
            ClientEvent::from_json(text).unwrap(),
            ClientEvent::IceCandidate { .. }
        ));

        let text = r#"{"event": "call-ended", "data": {"roomId": "a_b"}}"#;
        assert!(matches!(
            ClientEvent::from_json(text).unwrap(),
            ClientEvent::CallEnded { .. }
        ));
    }

    #[test]
    fn rejects_frame_with_missing_fields() {
        // An offer without a roomId must fail to parse (and is then dropped
        // by the relay, never forwarded half-formed).
        let text = r#"{"event": "offer", "data": {"offer": {}, "callType": "audio"}}"#;
        assert!(ClientEvent::from_json(text).is_err());
    }

    #[test]
    fn rejects_unknown_event_name() {
        let text = r#"{"event": "shutdown", "data": {}}"#;
        assert!(ClientEvent::from_json(text).is_err());
    }

    #[test]
    fn serializes_notification_with_wire_names() {
        let event = ServerEvent::ReceiveNotification {
            category: NotificationCategory::Swap,
            message: "New swap request".into(),
            sender: None,
            timestamp: Utc::now(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"event\":\"receiveNotification\""));
        assert!(json.contains("\"category\":\"swap\""));
        // Absent sender is omitted entirely, not serialized as null.
        assert!(!json.contains("sender"));
    }

    #[test]
    fn server_event_round_trip() {
        let event = ServerEvent::ReceiveMessage {
            sender: UserId::new("u1"),
            message: "hello".into(),
        };
        let json = event.to_json().unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
