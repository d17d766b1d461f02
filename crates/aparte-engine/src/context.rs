//! Engine context shared by every component.
//!
//! The [`ChatContext`] is constructed once by the embedding application and
//! cloned into each component, replacing any notion of process-wide
//! service state.  It carries the store handle and the current session.

use std::sync::{Arc, RwLock};

use aparte_shared::UserId;
use aparte_store::MemoryStore;

/// The current signed-in user, if any.  Written by the auth gateway,
/// read by every component that needs the viewer identity.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<UserId>>>,
}

impl SessionHandle {
    pub fn current(&self) -> Option<UserId> {
        self.inner.read().map(|guard| guard.clone()).unwrap_or(None)
    }

    pub(crate) fn set(&self, user: Option<UserId>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = user;
        }
    }
}

/// Injected handle bundling the store and the session.
#[derive(Clone)]
pub struct ChatContext {
    store: Arc<MemoryStore>,
    session: SessionHandle,
}

impl ChatContext {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            session: SessionHandle::default(),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// The signed-in user, or `None` before authentication.
    pub fn current_user(&self) -> Option<UserId> {
        self.session.current()
    }
}
