use thiserror::Error;

use aparte_shared::constants::MAX_MESSAGE_SIZE;
use aparte_shared::error::IdentityError;
use aparte_store::StoreError;

/// Errors surfaced by room and message operations.
///
/// Authentication has its own taxonomy (`aparte_shared::AuthError`);
/// presence and typing failures are logged and swallowed rather than
/// surfaced.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Message text must not be empty")]
    EmptyMessage,

    #[error("Message text exceeds {MAX_MESSAGE_SIZE} bytes")]
    MessageTooLong,
}
