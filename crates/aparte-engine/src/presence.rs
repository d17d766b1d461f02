//! Online/offline and last-seen presence.
//!
//! Presence is best-effort: write failures are logged and swallowed so
//! they never block navigation or messaging.

use chrono::{DateTime, Duration, Utc};

use aparte_shared::constants::ONLINE_GRACE_SECS;
use aparte_shared::UserId;
use aparte_store::{Snapshots, User};

use crate::context::ChatContext;

/// Publishes and reads per-user presence state.
pub struct Presence {
    ctx: ChatContext,
}

impl Presence {
    pub fn new(ctx: ChatContext) -> Self {
        Self { ctx }
    }

    /// Write the online flag and refresh the last-seen timestamp.
    pub fn set_online(&self, user: &UserId, online: bool) {
        let now = Utc::now();
        match self.ctx.store().update_user(user, |u| {
            u.is_online = online;
            u.last_seen_at = Some(now);
        }) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(user = %user, "presence write skipped, no user document")
            }
            Err(e) => tracing::warn!(user = %user, error = %e, "presence write failed"),
        }
    }

    /// Live snapshot of a user's document; `None` inside the snapshot
    /// means the document does not exist (yet).
    pub fn live_status(&self, user: &UserId) -> Snapshots<Option<User>> {
        self.ctx.store().watch_user(user)
    }
}

/// Whether the user counts as online right now: either the flag is set or
/// the last-seen timestamp is fresher than the grace window.
pub fn is_online(user: &User) -> bool {
    is_online_at(user, Utc::now())
}

pub fn is_online_at(user: &User, now: DateTime<Utc>) -> bool {
    if user.is_online {
        return true;
    }
    match user.last_seen_at {
        Some(seen) => now.signed_duration_since(seen) < Duration::seconds(ONLINE_GRACE_SECS),
        None => false,
    }
}

/// Human-readable last-seen line for a user.
pub fn last_seen_text(user: &User) -> String {
    last_seen_text_at(user, Utc::now())
}

pub fn last_seen_text_at(user: &User, now: DateTime<Utc>) -> String {
    if user.is_online {
        return "Online".to_string();
    }
    let Some(seen) = user.last_seen_at else {
        return "Last seen unknown".to_string();
    };

    let elapsed = now.signed_duration_since(seen);
    if elapsed.num_minutes() < 1 {
        "Last seen just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("Last seen {} minutes ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("Last seen {} hours ago", elapsed.num_hours())
    } else {
        format!("Last seen {} days ago", elapsed.num_days())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aparte_store::MemoryStore;

    use super::*;

    fn user(online: bool, seen_secs_ago: Option<i64>) -> User {
        let mut u = User::new("u1".into(), "U1", "u1@example.com");
        u.is_online = online;
        u.last_seen_at = seen_secs_ago.map(|s| Utc::now() - Duration::seconds(s));
        u
    }

    #[test]
    fn online_flag_wins() {
        let now = Utc::now();
        assert!(is_online_at(&user(true, None), now));
    }

    #[test]
    fn recent_last_seen_counts_as_online() {
        let now = Utc::now();
        assert!(is_online_at(&user(false, Some(60)), now));
        assert!(!is_online_at(&user(false, Some(ONLINE_GRACE_SECS + 1)), now));
        assert!(!is_online_at(&user(false, None), now));
    }

    #[test]
    fn last_seen_rendering_thresholds() {
        let now = Utc::now();
        assert_eq!(last_seen_text_at(&user(true, None), now), "Online");
        assert_eq!(
            last_seen_text_at(&user(false, None), now),
            "Last seen unknown"
        );
        assert_eq!(
            last_seen_text_at(&user(false, Some(30)), now),
            "Last seen just now"
        );
        assert_eq!(
            last_seen_text_at(&user(false, Some(5 * 60)), now),
            "Last seen 5 minutes ago"
        );
        assert_eq!(
            last_seen_text_at(&user(false, Some(3 * 3600)), now),
            "Last seen 3 hours ago"
        );
        assert_eq!(
            last_seen_text_at(&user(false, Some(2 * 86_400)), now),
            "Last seen 2 days ago"
        );
    }

    #[tokio::test]
    async fn set_online_refreshes_last_seen() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ChatContext::new(store.clone());
        store
            .create_user_if_absent(User::new("u1".into(), "U1", "u1@example.com"))
            .unwrap();

        let presence = Presence::new(ctx);
        presence.set_online(&"u1".into(), true);

        let stored = store.get_user(&"u1".into()).unwrap().unwrap();
        assert!(stored.is_online);
        assert!(stored.last_seen_at.is_some());

        presence.set_online(&"u1".into(), false);
        let stored = store.get_user(&"u1".into()).unwrap().unwrap();
        assert!(!stored.is_online);
    }

    #[tokio::test]
    async fn presence_write_for_unknown_user_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let presence = Presence::new(ChatContext::new(store));
        // Must not panic or error.
        presence.set_online(&"ghost".into(), true);
    }
}
