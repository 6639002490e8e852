use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier, as issued by the identity collaborator.
///
/// The relay never inspects the contents; it only uses the identifier as a
/// map key and as the name of the user's personal room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.  Truncates on a character boundary, so
    /// identifiers containing multi-byte characters are safe to log.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single live transport session.  One per WebSocket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named delivery channel inside the relay.
///
/// Two kinds exist: personal rooms (name equals the user identifier, used as
/// the notification delivery address) and call rooms (deterministic pairing
/// of two user identifiers, used for signaling exchange).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The personal room of a user: the room name is the user id itself.
    pub fn personal(user: &UserId) -> Self {
        Self(user.0.clone())
    }

    /// Deterministic, order-independent call room for two users.
    ///
    /// Both peers compute the same name without a negotiation round-trip:
    /// the lexicographically smaller id comes first.
    pub fn call_pair(a: &UserId, b: &UserId) -> Self {
        if a.0 <= b.0 {
            Self(format!("{}_{}", a.0, b.0))
        } else {
            Self(format!("{}_{}", b.0, a.0))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this room name is a call-pair key that includes `user`.
    ///
    /// Checked as a full prefix or suffix around the separator rather than
    /// by splitting, so user identifiers that themselves contain `_` are
    /// still matched correctly and a personal room never passes as a call
    /// room.
    pub fn is_call_room_of(&self, user: &UserId) -> bool {
        let starts = self
            .0
            .strip_prefix(user.as_str())
            .is_some_and(|rest| rest.starts_with('_'));
        let ends = self
            .0
            .strip_suffix(user.as_str())
            .is_some_and(|rest| rest.ends_with('_'));
        starts || ends
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved, authenticated user as handed to the relay by the identity
/// collaborator.  Immutable for the lifetime of a connection: a block
/// applied mid-session only takes effect on the next admission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
    pub blocked: bool,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            display_name: display_name.into(),
            blocked: false,
        }
    }
}

/// Medium of a call attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallMedium {
    Audio,
    Video,
}

impl std::fmt::Display for CallMedium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallMedium::Audio => write!(f, "audio"),
            CallMedium::Video => write!(f, "video"),
        }
    }
}

/// Category of a notification record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Swap,
    Chat,
    Rating,
    Admin,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Swap => "swap",
            NotificationCategory::Chat => "chat",
            NotificationCategory::Rating => "rating",
            NotificationCategory::Admin => "admin",
            NotificationCategory::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "swap" => Some(Self::Swap),
            "chat" => Some(Self::Chat),
            "rating" => Some(Self::Rating),
            "admin" => Some(Self::Admin),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_pair_is_order_independent() {
        let a = UserId::new("64f1aa");
        let b = UserId::new("64f1bb");
        assert_eq!(RoomId::call_pair(&a, &b), RoomId::call_pair(&b, &a));
        assert_eq!(RoomId::call_pair(&a, &b).as_str(), "64f1aa_64f1bb");
    }

    #[test]
    fn call_pair_with_self_is_stable() {
        let a = UserId::new("u1");
        assert_eq!(RoomId::call_pair(&a, &a).as_str(), "u1_u1");
    }

    #[test]
    fn personal_room_name_is_user_id() {
        let u = UserId::new("64f1aa");
        assert_eq!(RoomId::personal(&u).as_str(), "64f1aa");
    }

    #[test]
    fn call_room_membership_check() {
        let a = UserId::new("u1");
        let b = UserId::new("u2");
        let c = UserId::new("u3");
        let room = RoomId::call_pair(&a, &b);
        assert!(room.is_call_room_of(&a));
        assert!(room.is_call_room_of(&b));
        assert!(!room.is_call_room_of(&c));
        assert!(!RoomId::personal(&a).is_call_room_of(&a));
    }

    #[test]
    fn short_is_char_boundary_safe() {
        // An 8th byte falling inside a multi-byte character must not panic.
        assert_eq!(UserId::new("aéééé").short(), "aéééé");
        assert_eq!(UserId::new("ééééééééé").short(), "éééééééé");
        assert_eq!(UserId::new("64f1aabbccdd").short(), "64f1aabb");
        assert_eq!(UserId::new("u1").short(), "u1");
    }

    #[test]
    fn call_room_membership_with_underscored_ids() {
        let a = UserId::new("user_one");
        let b = UserId::new("zed");
        let room = RoomId::call_pair(&a, &b);
        assert_eq!(room.as_str(), "user_one_zed");

        assert!(room.is_call_room_of(&a));
        assert!(room.is_call_room_of(&b));
        // Substrings of a member id are not members.
        assert!(!room.is_call_room_of(&UserId::new("one")));
        assert!(!room.is_call_room_of(&UserId::new("user")));
        // The personal room of an underscored id is not a call room.
        assert!(!RoomId::personal(&a).is_call_room_of(&a));
    }

    #[test]
    fn category_round_trip() {
        for cat in [
            NotificationCategory::Swap,
            NotificationCategory::Chat,
            NotificationCategory::Rating,
            NotificationCategory::Admin,
            NotificationCategory::System,
        ] {
            assert_eq!(NotificationCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(NotificationCategory::parse("bogus"), None);
    }
}
