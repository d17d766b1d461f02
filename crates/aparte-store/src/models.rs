//! Domain model structs held in the store's collections.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer over IPC.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aparte_shared::{MessageId, MessageStatus, RoomId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A known user.  Created on first authenticated reference, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    /// Whether the user currently reports itself online.
    pub is_online: bool,
    /// Last presence write; `None` until the user has been seen once.
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            is_online: false,
            last_seen_at: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatRoom
// ---------------------------------------------------------------------------

/// A two-party conversation container addressed by its canonical pair key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: RoomId,
    /// Normally exactly two user ids; malformed rooms are tolerated and
    /// rendered in degraded form rather than rejected.
    pub participants: Vec<UserId>,
    /// Preview of the most recent message, if any.
    pub last_message_text: Option<String>,
    pub last_message_sender: Option<UserId>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Per-user typing activity timestamps; entries are ephemeral and only
    /// meaningful within the freshness window, evaluated at read time.
    pub typing: HashMap<UserId, DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// A freshly created room with empty preview fields.
    pub fn new(id: RoomId, a: UserId, b: UserId) -> Self {
        Self {
            id,
            participants: vec![a, b],
            last_message_text: None,
            last_message_sender: None,
            last_message_at: None,
            typing: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// The other participant from `viewer`'s point of view.
    ///
    /// Rooms with a malformed participant list fall back to the first
    /// listed participant so the conversation still renders.
    pub fn counterpart(&self, viewer: &UserId) -> Option<&UserId> {
        self.participants
            .iter()
            .find(|p| *p != viewer)
            .or_else(|| self.participants.first())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Created once; only its status fields mutate, and
/// only forward (`Sent -> Delivered -> Read`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Advance to `Delivered`.  Returns whether the message changed; a
    /// message already delivered or read is left untouched.
    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == MessageStatus::Sent {
            self.status = MessageStatus::Delivered;
            self.delivered_at = Some(at);
            true
        } else {
            false
        }
    }

    /// Advance to `Read`.  Returns whether the message changed.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.status < MessageStatus::Read {
            self.status = MessageStatus::Read;
            self.read_at = Some(at);
            if self.delivered_at.is_none() {
                self.delivered_at = Some(at);
            }
            true
        } else {
            false
        }
    }

    /// Whether this message counts toward `viewer`'s unread total: authored
    /// by someone else and not yet read.
    pub fn is_unread_for(&self, viewer: &UserId) -> bool {
        self.sender_id != *viewer && self.status < MessageStatus::Read
    }
}
