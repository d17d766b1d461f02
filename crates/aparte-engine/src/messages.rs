//! Message lifecycle: send, delivery confirmation, batch read-marking and
//! the live message stream.

use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::task::JoinHandle;

use aparte_shared::constants::{DELIVERY_CONFIRM_DELAY, MAX_MESSAGE_SIZE};
use aparte_shared::{MessageId, RoomId, UserId};
use aparte_store::{MemoryStore, Message, Snapshots};

use crate::context::ChatContext;
use crate::error::EngineError;
use crate::unread::UnreadCount;

/// Owns the sent → delivered → read progression of messages in a room.
pub struct Messaging {
    ctx: ChatContext,
}

impl Messaging {
    pub fn new(ctx: ChatContext) -> Self {
        Self { ctx }
    }

    /// Append a message to the room.
    ///
    /// The message lands with status `Sent`; the store updates the room
    /// preview in the same write.  The returned receipt owns a deferred
    /// task that best-effort confirms delivery after
    /// [`DELIVERY_CONFIRM_DELAY`]; the transition is idempotent and safe
    /// to never run (process exit, cancellation).
    pub fn send(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        text: &str,
    ) -> Result<SendReceipt, EngineError> {
        if text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(EngineError::MessageTooLong);
        }

        let message = self.ctx.store().append_message(room_id, sender, text)?;
        tracing::info!(msg_id = %message.id, room = %room_id, "message sent");

        let delivery = spawn_delivery_confirm(
            Arc::downgrade(self.ctx.store()),
            room_id.clone(),
            message.id.clone(),
        );

        Ok(SendReceipt { message, delivery })
    }

    /// Confirm delivery of a single message.  Only meaningful while the
    /// message is still `Sent`; repeated calls are no-ops.
    pub fn mark_delivered(&self, room_id: &RoomId, id: &MessageId) -> Result<bool, EngineError> {
        let now = Utc::now();
        Ok(self
            .ctx
            .store()
            .update_message(room_id, id, |m| m.mark_delivered(now))?)
    }

    /// Mark every message in the room addressed to `viewer` as read, in
    /// one atomic batch.  Messages authored by the viewer are untouched.
    /// Returns the number of messages that changed.
    pub fn mark_room_read(&self, room_id: &RoomId, viewer: &UserId) -> Result<usize, EngineError> {
        let now = Utc::now();
        let changed = self.ctx.store().update_messages(room_id, |m| {
            if m.is_unread_for(viewer) {
                m.mark_read(now)
            } else {
                false
            }
        })?;
        if changed > 0 {
            tracing::debug!(room = %room_id, viewer = %viewer, changed, "room marked read");
        }
        Ok(changed)
    }

    /// Live view of a room's messages, oldest first, unbounded.
    pub fn live_messages(&self, room_id: &RoomId) -> Snapshots<Vec<Message>> {
        self.ctx.store().watch_messages(room_id)
    }

    /// Live count of messages addressed to `viewer` not yet read — a pure
    /// projection of [`Self::live_messages`].
    pub fn live_unread_count(&self, room_id: &RoomId, viewer: &UserId) -> UnreadCount {
        UnreadCount::new(self.live_messages(room_id), viewer.clone())
    }
}

/// Handle returned by [`Messaging::send`].
///
/// Owns the deferred delivery-confirmation task.  Dropping the receipt
/// leaves the task running to completion; call [`Self::cancel_delivery`]
/// when the owning session ends so no write happens after teardown.
pub struct SendReceipt {
    message: Message,
    delivery: JoinHandle<()>,
}

impl SendReceipt {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message.id
    }

    /// Abort the pending delivery confirmation.
    pub fn cancel_delivery(&self) {
        self.delivery.abort();
    }
}

fn spawn_delivery_confirm(
    store: Weak<MemoryStore>,
    room_id: RoomId,
    id: MessageId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(DELIVERY_CONFIRM_DELAY).await;
        let Some(store) = store.upgrade() else {
            return;
        };
        let now = Utc::now();
        if let Err(e) = store.update_message(&room_id, &id, |m| m.mark_delivered(now)) {
            tracing::warn!(msg_id = %id, error = %e, "delivery confirmation failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use aparte_shared::MessageStatus;
    use aparte_store::MemoryStore;

    use crate::rooms::RoomDirectory;

    use super::*;

    fn engine() -> (Arc<MemoryStore>, Messaging, RoomId) {
        let store = Arc::new(MemoryStore::new());
        let ctx = ChatContext::new(store.clone());
        let room = RoomDirectory::new(ctx.clone())
            .ensure_room(&"u1".into(), &"u2".into())
            .unwrap();
        (store, Messaging::new(ctx), room)
    }

    #[tokio::test]
    async fn send_rejects_empty_and_oversized_text() {
        let (_store, messaging, room) = engine();

        assert!(matches!(
            messaging.send(&room, &"u1".into(), ""),
            Err(EngineError::EmptyMessage)
        ));

        let oversized = "x".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            messaging.send(&room, &"u1".into(), &oversized),
            Err(EngineError::MessageTooLong)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_confirms_after_the_delay() {
        let (_store, messaging, room) = engine();

        let receipt = messaging.send(&room, &"u1".into(), "hello").unwrap();
        assert_eq!(receipt.message().status, MessageStatus::Sent);

        // The subscription wakes when the deferred task fires.
        let mut live = messaging.live_messages(&room);
        let initial = live.recv().await.unwrap();
        assert_eq!(initial[0].status, MessageStatus::Sent);

        let updated = live.recv().await.unwrap();
        assert_eq!(updated[0].status, MessageStatus::Delivered);
        assert!(updated[0].delivered_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_delivery_never_fires() {
        let (store, messaging, room) = engine();

        let receipt = messaging.send(&room, &"u1".into(), "hello").unwrap();
        receipt.cancel_delivery();

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        let messages = store.messages_in(&room).unwrap();
        assert_eq!(messages[0].status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn mark_delivered_is_idempotent() {
        let (_store, messaging, room) = engine();
        let receipt = messaging.send(&room, &"u1".into(), "hello").unwrap();
        receipt.cancel_delivery();

        assert!(messaging.mark_delivered(&room, receipt.message_id()).unwrap());
        assert!(!messaging.mark_delivered(&room, receipt.message_id()).unwrap());
    }

    #[tokio::test]
    async fn mark_room_read_skips_the_viewers_own_messages() {
        let (store, messaging, room) = engine();

        let m1 = messaging.send(&room, &"u1".into(), "from u1").unwrap();
        m1.cancel_delivery();
        let m2 = messaging.send(&room, &"u2".into(), "from u2").unwrap();
        m2.cancel_delivery();
        messaging.mark_delivered(&room, m2.message_id()).unwrap();

        // u1 reads the room: only u2's message flips to Read.
        let changed = messaging.mark_room_read(&room, &"u1".into()).unwrap();
        assert_eq!(changed, 1);

        let messages = store.messages_in(&room).unwrap();
        let by_sender = |s: &str| {
            messages
                .iter()
                .find(|m| m.sender_id == s.into())
                .unwrap()
                .clone()
        };
        assert_eq!(by_sender("u1").status, MessageStatus::Sent);
        let read = by_sender("u2");
        assert_eq!(read.status, MessageStatus::Read);
        assert!(read.read_at.is_some());
    }

    #[tokio::test]
    async fn mark_room_read_twice_changes_nothing() {
        let (_store, messaging, room) = engine();
        let receipt = messaging.send(&room, &"u2".into(), "hi").unwrap();
        receipt.cancel_delivery();

        assert_eq!(messaging.mark_room_read(&room, &"u1".into()).unwrap(), 1);
        assert_eq!(messaging.mark_room_read(&room, &"u1".into()).unwrap(), 0);
    }
}
