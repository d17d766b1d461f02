use thiserror::Error;

/// Errors from deriving a room key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("User identifier must not be empty")]
    EmptyUserId,
}

/// Authentication failures, one fixed user-facing message per kind.
///
/// The first two variants are validation errors raised before any
/// credential-service attempt; the rest classify the final failure after
/// retries are exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,

    #[error("Network error, please check your connection and try again")]
    Network,

    #[error("An account with that email already exists")]
    DuplicateAccount,

    #[error("That password is too weak, please choose another")]
    WeakCredential,

    #[error("The email or password is malformed")]
    MalformedInput,

    #[error("This account has been disabled")]
    AccountDisabled,

    #[error("No account found for that email and password")]
    AccountNotFound,

    #[error("Something went wrong, please try again")]
    Unclassified,
}

impl AuthError {
    /// Whether the error was raised before any credential-service attempt.
    pub fn is_validation(&self) -> bool {
        matches!(self, AuthError::InvalidEmail | AuthError::PasswordTooShort)
    }
}
