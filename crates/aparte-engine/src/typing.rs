//! Ephemeral typing signals with debounced publication and lazy expiry.
//!
//! Typing writes are best-effort: failures are logged and swallowed.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use aparte_shared::constants::{TYPING_FRESH_WINDOW_SECS, TYPING_IDLE_TIMEOUT};
use aparte_shared::{RoomId, UserId};
use aparte_store::{ChatRoom, MemoryStore, Snapshots};

use crate::context::ChatContext;

/// Publishes and observes per-room typing activity.
pub struct Typing {
    ctx: ChatContext,
}

impl Typing {
    pub fn new(ctx: ChatContext) -> Self {
        Self { ctx }
    }

    /// Write or clear the user's typing timestamp on the room.
    pub fn set_typing(&self, room_id: &RoomId, user: &UserId, is_typing: bool) {
        write_typing(self.ctx.store(), room_id, user, is_typing);
    }

    /// Start a local typing session for one open room.
    ///
    /// The session owns the debounce policy: feeding it keystrokes signals
    /// `true` at most once per idle period and clears the flag after
    /// [`TYPING_IDLE_TIMEOUT`] without input.
    pub fn session(&self, room_id: &RoomId, user: &UserId) -> TypingSession {
        TypingSession {
            ctx: self.ctx.clone(),
            room_id: room_id.clone(),
            user: user.clone(),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Live set of users currently typing in the room, excluding `viewer`.
    /// Staleness is evaluated lazily against the clock at read time, so
    /// entries that were never physically removed still age out.
    pub fn live_typists(&self, room_id: &RoomId, viewer: &UserId) -> LiveTypists {
        LiveTypists {
            inner: self.ctx.store().watch_room(room_id),
            viewer: viewer.clone(),
        }
    }
}

fn write_typing(store: &MemoryStore, room_id: &RoomId, user: &UserId, is_typing: bool) {
    let now = Utc::now();
    let result = store.update_room(room_id, |room| {
        if is_typing {
            room.typing.insert(user.clone(), now);
            true
        } else {
            room.typing.remove(user).is_some()
        }
    });
    if let Err(e) = result {
        tracing::warn!(room = %room_id, user = %user, error = %e, "typing write failed");
    }
}

#[derive(Default)]
struct SessionState {
    /// Whether the current idle period has already been signaled.
    signaled: bool,
    idle_timer: Option<JoinHandle<()>>,
}

/// Local typing state for one user in one open room.
///
/// Dropping the session (leaving the room) aborts the idle timer and
/// unconditionally clears the user's typing entry.
pub struct TypingSession {
    ctx: ChatContext,
    room_id: RoomId,
    user: UserId,
    state: Arc<Mutex<SessionState>>,
}

impl TypingSession {
    /// Record a local keystroke: signal typing once per idle period and
    /// restart the idle timer.
    pub fn keystroke(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if !state.signaled {
            state.signaled = true;
            write_typing(self.ctx.store(), &self.room_id, &self.user, true);
        }

        if let Some(timer) = state.idle_timer.take() {
            timer.abort();
        }

        let ctx = self.ctx.clone();
        let room_id = self.room_id.clone();
        let user = self.user.clone();
        let shared = Arc::clone(&self.state);
        state.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(TYPING_IDLE_TIMEOUT).await;
            write_typing(ctx.store(), &room_id, &user, false);
            if let Ok(mut state) = shared.lock() {
                state.signaled = false;
                state.idle_timer = None;
            }
        }));
    }

    /// Leave the room, clearing the typing entry.
    pub fn leave(self) {}
}

impl Drop for TypingSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(timer) = state.idle_timer.take() {
                timer.abort();
            }
        }
        write_typing(self.ctx.store(), &self.room_id, &self.user, false);
    }
}

/// Live view of who is typing in a room.
pub struct LiveTypists {
    inner: Snapshots<Option<ChatRoom>>,
    viewer: UserId,
}

impl LiveTypists {
    pub async fn recv(&mut self) -> Option<Vec<UserId>> {
        self.inner
            .recv()
            .await
            .map(|room| fresh_typists(room.as_ref(), &self.viewer, Utc::now()))
    }
}

fn fresh_typists(room: Option<&ChatRoom>, viewer: &UserId, now: DateTime<Utc>) -> Vec<UserId> {
    let Some(room) = room else {
        return Vec::new();
    };
    let mut typists: Vec<UserId> = room
        .typing
        .iter()
        .filter(|(user, stamp)| {
            *user != viewer
                && now.signed_duration_since(**stamp).num_seconds() < TYPING_FRESH_WINDOW_SECS
        })
        .map(|(user, _)| user.clone())
        .collect();
    typists.sort();
    typists
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use crate::rooms::RoomDirectory;

    use super::*;

    fn typing() -> (Arc<MemoryStore>, Typing, RoomId) {
        let store = Arc::new(MemoryStore::new());
        let ctx = ChatContext::new(store.clone());
        let room = RoomDirectory::new(ctx.clone())
            .ensure_room(&"u1".into(), &"u2".into())
            .unwrap();
        (store, Typing::new(ctx), room)
    }

    fn typing_stamp(store: &MemoryStore, room: &RoomId, user: &UserId) -> Option<DateTime<Utc>> {
        store
            .get_room(room)
            .unwrap()
            .unwrap()
            .typing
            .get(user)
            .copied()
    }

    #[tokio::test]
    async fn set_typing_writes_and_clears_the_entry() {
        let (store, typing, room) = typing();
        let u2: UserId = "u2".into();

        typing.set_typing(&room, &u2, true);
        assert!(typing_stamp(&store, &room, &u2).is_some());

        typing.set_typing(&room, &u2, false);
        assert!(typing_stamp(&store, &room, &u2).is_none());
    }

    #[tokio::test]
    async fn live_typists_excludes_the_viewer() {
        let (_store, typing, room) = typing();
        typing.set_typing(&room, &"u1".into(), true);
        typing.set_typing(&room, &"u2".into(), true);

        let mut live = typing.live_typists(&room, &"u1".into());
        assert_eq!(live.recv().await.unwrap(), vec![UserId::from("u2")]);
    }

    #[tokio::test]
    async fn stale_entries_age_out_without_deletion() {
        let (store, typing, room) = typing();
        let stale = Utc::now() - Duration::seconds(TYPING_FRESH_WINDOW_SECS + 1);
        store
            .update_room(&room, |r| {
                r.typing.insert("u2".into(), stale);
                true
            })
            .unwrap();

        let mut live = typing.live_typists(&room, &"u1".into());
        assert_eq!(live.recv().await.unwrap(), Vec::<UserId>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_signal_once_per_idle_period() {
        let (store, typing, room) = typing();
        let u1: UserId = "u1".into();
        let session = typing.session(&room, &u1);

        session.keystroke();
        let first = typing_stamp(&store, &room, &u1).expect("typing flag set");

        // A burst of keystrokes must not rewrite the entry.
        session.keystroke();
        session.keystroke();
        assert_eq!(typing_stamp(&store, &room, &u1), Some(first));

        session.leave();
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_clears_the_flag() {
        let (store, typing, room) = typing();
        let u1: UserId = "u1".into();
        let session = typing.session(&room, &u1);

        session.keystroke();
        assert!(typing_stamp(&store, &room, &u1).is_some());

        tokio::time::advance(TYPING_IDLE_TIMEOUT + StdDuration::from_millis(10)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(typing_stamp(&store, &room, &u1).is_none());

        // The next keystroke opens a fresh idle period and signals again.
        session.keystroke();
        assert!(typing_stamp(&store, &room, &u1).is_some());

        session.leave();
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_clears_the_entry() {
        let (store, typing, room) = typing();
        let u1: UserId = "u1".into();

        let session = typing.session(&room, &u1);
        session.keystroke();
        assert!(typing_stamp(&store, &room, &u1).is_some());

        session.leave();
        assert!(typing_stamp(&store, &room, &u1).is_none());
    }
}
