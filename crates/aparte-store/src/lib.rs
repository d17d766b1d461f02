//! # aparte-store
//!
//! In-process document store for the conversation engine: typed collections
//! for users, rooms and messages with create-if-absent, merge-update and
//! atomic batched writes, plus push-based snapshot subscriptions.
//!
//! The crate exposes a synchronous [`MemoryStore`] handle; mutations take a
//! short write lock and publish a change signal that live subscriptions
//! ([`Snapshots`]) wake on to re-read their query.

pub mod models;
pub mod store;
pub mod subscription;

mod error;

pub use error::StoreError;
pub use models::{ChatRoom, Message, User};
pub use store::MemoryStore;
pub use subscription::Snapshots;
