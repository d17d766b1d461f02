use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ROOM_KEY_SEPARATOR;
use crate::error::IdentityError;

/// Opaque user identifier, assigned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Canonical key of a two-party room.
///
/// The key is a pure function of the two participant ids: they are sorted
/// lexicographically and joined with [`ROOM_KEY_SEPARATOR`], so
/// `RoomId::between(a, b) == RoomId::between(b, a)` for all inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub String);

impl RoomId {
    /// Derive the canonical room key for a pair of users.
    ///
    /// Fails only when either identifier is empty; callers are expected to
    /// reject such input rather than retry.
    pub fn between(a: &UserId, b: &UserId) -> Result<Self, IdentityError> {
        if a.is_empty() || b.is_empty() {
            return Err(IdentityError::EmptyUserId);
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{}{}{}", lo, ROOM_KEY_SEPARATOR, hi)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a chat message, assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a chat message.
///
/// The derived order (`Sent < Delivered < Read`) is the only direction a
/// message may move in; the transition guards live on the message model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Message has been written, awaiting delivery confirmation.
    #[default]
    Sent,
    /// Counterpart has received the message.
    Delivered,
    /// Counterpart has read the message.
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_key_is_symmetric() {
        let pairs = [
            ("alice", "bob"),
            ("bob", "alice"),
            ("u1", "u2"),
            ("zz", "aa"),
            ("a", "a"),
        ];
        for (a, b) in pairs {
            let ab = RoomId::between(&a.into(), &b.into()).unwrap();
            let ba = RoomId::between(&b.into(), &a.into()).unwrap();
            assert_eq!(ab, ba, "key must not depend on argument order");
        }
    }

    #[test]
    fn room_key_sorts_lexicographically() {
        let id = RoomId::between(&"u2".into(), &"u1".into()).unwrap();
        assert_eq!(id.as_str(), "u1_u2");
    }

    #[test]
    fn room_key_rejects_empty_ids() {
        assert!(RoomId::between(&"".into(), &"bob".into()).is_err());
        assert!(RoomId::between(&"alice".into(), &"".into()).is_err());
    }

    #[test]
    fn status_order_is_monotonic() {
        assert!(MessageStatus::Sent < MessageStatus::Delivered);
        assert!(MessageStatus::Delivered < MessageStatus::Read);
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }
}
