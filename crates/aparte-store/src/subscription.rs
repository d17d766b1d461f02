//! Push-based snapshot subscriptions.
//!
//! A [`Snapshots`] value is a live view of one store query: the first
//! `recv` returns the current snapshot, every later `recv` suspends until
//! the store publishes a relevant change and then re-reads the query.  A
//! lagged receiver recomputes instead of replaying missed signals, so the
//! latest state is never skipped.  Dropping the subscription cancels it
//! with no side effects.

use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::store::Change;

type Filter = Box<dyn Fn(&Change) -> bool + Send>;
type Query<T> = Box<dyn Fn() -> Option<T> + Send>;

/// A live, push-delivered view of a single store query.
pub struct Snapshots<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Live {
        rx: broadcast::Receiver<Change>,
        filter: Filter,
        query: Query<T>,
        primed: bool,
    },
    Closed,
}

impl<T> Snapshots<T> {
    pub(crate) fn live(rx: broadcast::Receiver<Change>, filter: Filter, query: Query<T>) -> Self {
        Self {
            inner: Inner::Live {
                rx,
                filter,
                query,
                primed: false,
            },
        }
    }

    /// A subscription that yields nothing and terminates immediately.
    pub fn closed() -> Self {
        Self {
            inner: Inner::Closed,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription has terminated (constructed
    /// closed, or the backing store was dropped).
    pub async fn recv(&mut self) -> Option<T> {
        let Inner::Live {
            rx,
            filter,
            query,
            primed,
        } = &mut self.inner
        else {
            return None;
        };

        if !*primed {
            *primed = true;
            return query();
        }

        loop {
            match rx.recv().await {
                Ok(change) if filter(&change) => return query(),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    tracing::trace!(missed, "snapshot subscription lagged, recomputing");
                    return query();
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription into a [`Stream`] for async iteration.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send
    where
        T: Send,
    {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|snapshot| (snapshot, sub))
        })
    }
}
