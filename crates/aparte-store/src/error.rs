use aparte_shared::RoomId;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A writer panicked while holding the state lock.
    #[error("Store lock poisoned")]
    LockPoisoned,

    /// A message write referenced a room that was never created.
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
