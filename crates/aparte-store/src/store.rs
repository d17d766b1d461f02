//! The in-process document store.
//!
//! [`MemoryStore`] keeps typed collections for users, rooms and per-room
//! messages behind a single `RwLock`; every mutation is a short critical
//! section followed by a change signal on a broadcast feed.  Subscriptions
//! re-read their query on each relevant signal, giving push-delivered
//! snapshot semantics without polling.
//!
//! Write primitives mirror what the engine relies on: create-if-absent for
//! users and rooms, closure-based merge updates for single documents, and
//! an atomic batched update over a room's messages.  All single-document
//! writes are last-writer-wins.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use aparte_shared::{MessageId, MessageStatus, RoomId, UserId};

use crate::error::{Result, StoreError};
use crate::models::{ChatRoom, Message, User};
use crate::subscription::Snapshots;

/// Capacity of the change feed.  A lagged subscriber recomputes its query,
/// so overflow degrades to an extra read, never to a missed state.
const CHANGE_FEED_CAPACITY: usize = 64;

/// A change signal published after each committed write.
#[derive(Debug, Clone)]
pub enum Change {
    /// A user document was created or merged.
    Users,
    /// A room document was created or merged (including typing writes).
    Rooms,
    /// Messages of the given room were appended or updated.
    Messages(RoomId),
}

#[derive(Default)]
struct Collections {
    users: BTreeMap<UserId, User>,
    rooms: BTreeMap<RoomId, ChatRoom>,
    messages: BTreeMap<RoomId, Vec<Message>>,
}

/// Handle to the in-process store.  Cheap to share via `Arc`.
pub struct MemoryStore {
    state: std::sync::RwLock<Collections>,
    changes: broadcast::Sender<Change>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: std::sync::RwLock::new(Collections::default()),
            changes,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn publish(&self, change: Change) {
        // No receivers is the normal idle case.
        let _ = self.changes.send(change);
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create the user document unless it already exists.  Returns whether
    /// a document was written.
    pub fn create_user_if_absent(&self, user: User) -> Result<bool> {
        let created = {
            let mut state = self.write()?;
            match state.users.entry(user.id.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(user);
                    true
                }
            }
        };
        if created {
            self.publish(Change::Users);
        }
        Ok(created)
    }

    /// Merge-update a user document.  Returns `false` if it does not exist.
    pub fn update_user(&self, id: &UserId, apply: impl FnOnce(&mut User)) -> Result<bool> {
        let updated = {
            let mut state = self.write()?;
            match state.users.get_mut(id) {
                Some(user) => {
                    apply(user);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.publish(Change::Users);
        }
        Ok(updated)
    }

    pub fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    /// Create the room unless it already exists.  Never overwrites, so two
    /// participants racing to initiate contact converge on one document.
    pub fn create_room_if_absent(&self, room: ChatRoom) -> Result<bool> {
        let created = {
            let mut state = self.write()?;
            match state.rooms.entry(room.id.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(room);
                    true
                }
            }
        };
        if created {
            self.publish(Change::Rooms);
        }
        Ok(created)
    }

    pub fn get_room(&self, id: &RoomId) -> Result<Option<ChatRoom>> {
        Ok(self.read()?.rooms.get(id).cloned())
    }

    /// Merge-update a room document.  `apply` reports whether it changed
    /// anything; unchanged rooms publish no signal.
    pub fn update_room(
        &self,
        id: &RoomId,
        apply: impl FnOnce(&mut ChatRoom) -> bool,
    ) -> Result<bool> {
        let changed = {
            let mut state = self.write()?;
            match state.rooms.get_mut(id) {
                Some(room) => apply(room),
                None => false,
            }
        };
        if changed {
            self.publish(Change::Rooms);
        }
        Ok(changed)
    }

    /// All rooms whose participant list contains `user`, in store order.
    pub fn rooms_for(&self, user: &UserId) -> Result<Vec<ChatRoom>> {
        Ok(self
            .read()?
            .rooms
            .values()
            .filter(|room| room.has_participant(user))
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message to a room.
    ///
    /// The store assigns the id and timestamp, and updates the parent
    /// room's last-message preview under the same lock, so no reader ever
    /// observes the message without the room preview.
    pub fn append_message(&self, room_id: &RoomId, sender: &UserId, text: &str) -> Result<Message> {
        let message = {
            let mut state = self.write()?;
            let room = state
                .rooms
                .get_mut(room_id)
                .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;

            let message = Message {
                id: MessageId::new(),
                room_id: room_id.clone(),
                sender_id: sender.clone(),
                text: text.to_string(),
                created_at: Utc::now(),
                status: MessageStatus::Sent,
                delivered_at: None,
                read_at: None,
            };

            room.last_message_text = Some(message.text.clone());
            room.last_message_sender = Some(message.sender_id.clone());
            room.last_message_at = Some(message.created_at);

            state
                .messages
                .entry(room_id.clone())
                .or_default()
                .push(message.clone());
            message
        };

        self.publish(Change::Messages(room_id.clone()));
        self.publish(Change::Rooms);
        Ok(message)
    }

    /// Update a single message.  `apply` reports whether it changed the
    /// document; an absent or unchanged message publishes nothing, which
    /// keeps repeated status transitions idempotent.
    pub fn update_message(
        &self,
        room_id: &RoomId,
        id: &MessageId,
        apply: impl FnOnce(&mut Message) -> bool,
    ) -> Result<bool> {
        let changed = {
            let mut state = self.write()?;
            state
                .messages
                .get_mut(room_id)
                .and_then(|messages| messages.iter_mut().find(|m| m.id == *id))
                .map(apply)
                .unwrap_or(false)
        };
        if changed {
            self.publish(Change::Messages(room_id.clone()));
        }
        Ok(changed)
    }

    /// Atomically update every message of a room in one batch.
    ///
    /// `apply` runs on each message under a single write lock and reports
    /// whether it changed the document; readers observe either none or all
    /// of the batch.  Returns the number of changed messages.
    pub fn update_messages(
        &self,
        room_id: &RoomId,
        mut apply: impl FnMut(&mut Message) -> bool,
    ) -> Result<usize> {
        let changed = {
            let mut state = self.write()?;
            let mut changed = 0;
            if let Some(messages) = state.messages.get_mut(room_id) {
                for message in messages.iter_mut() {
                    if apply(message) {
                        changed += 1;
                    }
                }
            }
            changed
        };
        if changed > 0 {
            self.publish(Change::Messages(room_id.clone()));
        }
        Ok(changed)
    }

    /// All messages of a room, oldest first.  Equal timestamps keep store
    /// insertion order.
    pub fn messages_in(&self, room_id: &RoomId) -> Result<Vec<Message>> {
        let mut messages = self
            .read()?
            .messages
            .get(room_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn watch_user(self: &Arc<Self>, id: &UserId) -> Snapshots<Option<User>> {
        let store = Arc::downgrade(self);
        let id = id.clone();
        Snapshots::live(
            self.changes.subscribe(),
            Box::new(|change| matches!(change, Change::Users)),
            Box::new(move || {
                store
                    .upgrade()
                    .map(|s| s.get_user(&id).unwrap_or_default())
            }),
        )
    }

    pub fn watch_room(self: &Arc<Self>, id: &RoomId) -> Snapshots<Option<ChatRoom>> {
        let store = Arc::downgrade(self);
        let id = id.clone();
        Snapshots::live(
            self.changes.subscribe(),
            Box::new(|change| matches!(change, Change::Rooms)),
            Box::new(move || {
                store
                    .upgrade()
                    .map(|s| s.get_room(&id).unwrap_or_default())
            }),
        )
    }

    /// Live view of all rooms containing `user`, in store order; ordering
    /// beyond that is the caller's concern.
    pub fn watch_rooms(self: &Arc<Self>, user: &UserId) -> Snapshots<Vec<ChatRoom>> {
        let store = Arc::downgrade(self);
        let user = user.clone();
        Snapshots::live(
            self.changes.subscribe(),
            Box::new(|change| matches!(change, Change::Rooms)),
            Box::new(move || {
                store
                    .upgrade()
                    .map(|s| s.rooms_for(&user).unwrap_or_default())
            }),
        )
    }

    /// Live view of a room's messages, oldest first.
    pub fn watch_messages(self: &Arc<Self>, room_id: &RoomId) -> Snapshots<Vec<Message>> {
        let store = Arc::downgrade(self);
        let filter_room = room_id.clone();
        let query_room = room_id.clone();
        Snapshots::live(
            self.changes.subscribe(),
            Box::new(move |change| matches!(change, Change::Messages(r) if *r == filter_room)),
            Box::new(move || {
                store
                    .upgrade()
                    .map(|s| s.messages_in(&query_room).unwrap_or_default())
            }),
        )
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
