//! # aparte-engine
//!
//! Two-party conversation synchronization engine: room addressing, message
//! delivery/read progression, typing presence, online/last-seen presence
//! and unread aggregation on top of the push-based document store in
//! `aparte-store`.
//!
//! All components are constructed from an explicitly injected
//! [`ChatContext`]; there is no process-wide state.  Authentication via
//! [`auth::AuthGateway`] gates everything else: the context carries no
//! session until a sign-in succeeds.

pub mod auth;
pub mod context;
pub mod error;
pub mod messages;
pub mod presence;
pub mod rooms;
pub mod typing;
pub mod unread;

pub use auth::{AuthGateway, CredentialService, MemoryCredentials};
pub use context::ChatContext;
pub use error::EngineError;
pub use messages::{Messaging, SendReceipt};
pub use presence::Presence;
pub use rooms::{LiveRooms, RoomDirectory};
pub use typing::{LiveTypists, Typing, TypingSession};
pub use unread::UnreadCount;
