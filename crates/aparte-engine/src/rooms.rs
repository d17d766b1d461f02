//! Room directory: lazy room creation and the live, ordered room list.

use std::cmp::Ordering;

use aparte_shared::{RoomId, UserId};
use aparte_store::{ChatRoom, Snapshots, User};

use crate::context::ChatContext;
use crate::error::EngineError;

/// Maintains the set of rooms a user participates in.
pub struct RoomDirectory {
    ctx: ChatContext,
}

impl RoomDirectory {
    pub fn new(ctx: ChatContext) -> Self {
        Self { ctx }
    }

    /// Resolve the canonical room for a pair of users, creating it on
    /// first contact.  Re-creation attempts are no-ops, so two
    /// participants initiating contact simultaneously converge on one
    /// room document.
    ///
    /// Both user documents are provisioned create-if-absent on the way;
    /// a user referenced here for the first time gets a minimal document
    /// that later presence and profile writes flesh out.
    pub fn ensure_room(&self, me: &UserId, other: &UserId) -> Result<RoomId, EngineError> {
        let room_id = RoomId::between(me, other)?;

        for user in [me, other] {
            self.ctx
                .store()
                .create_user_if_absent(User::new(user.clone(), user.as_str(), ""))?;
        }

        let created = self
            .ctx
            .store()
            .create_room_if_absent(ChatRoom::new(room_id.clone(), me.clone(), other.clone()))?;
        if created {
            tracing::info!(room = %room_id, "room created");
        }

        Ok(room_id)
    }

    /// Live, ordered list of the current user's rooms.
    ///
    /// Without a session the view yields nothing and terminates
    /// immediately.
    pub fn live_rooms(&self) -> LiveRooms {
        match self.ctx.current_user() {
            Some(user) => LiveRooms {
                inner: self.ctx.store().watch_rooms(&user),
            },
            None => LiveRooms {
                inner: Snapshots::closed(),
            },
        }
    }
}

/// Live room list, re-sorted on every incoming snapshot.
///
/// The store does not promise server-side ordering for the participant
/// query, so each snapshot is sorted here: most recent message first,
/// rooms without any message after all timestamped rooms, ties keeping
/// store order.
pub struct LiveRooms {
    inner: Snapshots<Vec<ChatRoom>>,
}

impl LiveRooms {
    pub async fn recv(&mut self) -> Option<Vec<ChatRoom>> {
        self.inner.recv().await.map(sort_rooms)
    }
}

fn sort_rooms(mut rooms: Vec<ChatRoom>) -> Vec<ChatRoom> {
    rooms.sort_by(|a, b| match (&a.last_message_at, &b.last_message_at) {
        (Some(ta), Some(tb)) => tb.cmp(ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rooms
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aparte_store::MemoryStore;
    use chrono::{Duration, Utc};

    use super::*;

    fn directory() -> (Arc<MemoryStore>, RoomDirectory, ChatContext) {
        let store = Arc::new(MemoryStore::new());
        let ctx = ChatContext::new(store.clone());
        (store.clone(), RoomDirectory::new(ctx.clone()), ctx)
    }

    #[test]
    fn ensure_room_is_idempotent() {
        let (store, directory, _ctx) = directory();

        let first = directory.ensure_room(&"u1".into(), &"u2".into()).unwrap();
        store.append_message(&first, &"u1".into(), "hello").unwrap();

        // Initiating from the other side resolves the same room and
        // leaves its state alone.
        let second = directory.ensure_room(&"u2".into(), &"u1".into()).unwrap();
        assert_eq!(first, second);

        let room = store.get_room(&first).unwrap().unwrap();
        assert_eq!(room.last_message_text.as_deref(), Some("hello"));
    }

    #[test]
    fn ensure_room_provisions_user_documents() {
        let (store, directory, _ctx) = directory();
        directory.ensure_room(&"u1".into(), &"u2".into()).unwrap();

        assert!(store.get_user(&"u1".into()).unwrap().is_some());
        assert!(store.get_user(&"u2".into()).unwrap().is_some());
    }

    #[test]
    fn fresh_room_has_no_preview() {
        let (store, directory, _ctx) = directory();
        let room_id = directory.ensure_room(&"u1".into(), &"u2".into()).unwrap();

        let room = store.get_room(&room_id).unwrap().unwrap();
        assert!(room.last_message_at.is_none());
        assert!(room.last_message_text.is_none());
        assert!(room.last_message_sender.is_none());
    }

    #[tokio::test]
    async fn live_rooms_requires_a_session() {
        let (_store, directory, _ctx) = directory();
        let mut rooms = directory.live_rooms();
        assert!(rooms.recv().await.is_none());
    }

    #[tokio::test]
    async fn live_rooms_orders_recent_first_and_empty_last() {
        let (store, directory, ctx) = directory();
        ctx.session().set(Some("u1".into()));

        let with_old = directory.ensure_room(&"u1".into(), &"u2".into()).unwrap();
        let with_new = directory.ensure_room(&"u1".into(), &"u3".into()).unwrap();
        let without = directory.ensure_room(&"u1".into(), &"u4".into()).unwrap();

        let now = Utc::now();
        store
            .update_room(&with_old, |r| {
                r.last_message_at = Some(now - Duration::minutes(10));
                true
            })
            .unwrap();
        store
            .update_room(&with_new, |r| {
                r.last_message_at = Some(now);
                true
            })
            .unwrap();

        let mut live = directory.live_rooms();
        let snapshot = live.recv().await.unwrap();
        let ids: Vec<_> = snapshot.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![with_new, with_old, without]);
    }
}
