//! Live unread count, derived from the message stream.

use aparte_shared::UserId;
use aparte_store::{Message, Snapshots};

/// Live count of messages in a room addressed to the viewer that are not
/// yet read.
///
/// The count is a pure projection over the room's message snapshots —
/// there is no stored counter to drift out of sync — and it re-emits
/// whenever any contributing message's status changes.
pub struct UnreadCount {
    messages: Snapshots<Vec<Message>>,
    viewer: UserId,
}

impl UnreadCount {
    pub fn new(messages: Snapshots<Vec<Message>>, viewer: UserId) -> Self {
        Self { messages, viewer }
    }

    pub async fn recv(&mut self) -> Option<usize> {
        self.messages
            .recv()
            .await
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.is_unread_for(&self.viewer))
                    .count()
            })
    }
}
