//! Authentication gateway: validation, bounded retries and error
//! classification around an external credential service.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use aparte_shared::constants::{AUTH_ATTEMPTS, AUTH_RETRY_PAUSE};
use aparte_shared::validate::{validate_email, validate_password};
use aparte_shared::{AuthError, UserId};
use aparte_store::User;

use crate::context::ChatContext;
use crate::presence::Presence;

/// Failures reported by the credential service, before classification
/// into user-facing [`AuthError`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("network unreachable")]
    Network,

    #[error("email already registered")]
    EmailInUse,

    #[error("credential rejected as too weak")]
    WeakCredential,

    #[error("malformed credential payload")]
    Malformed,

    #[error("account disabled")]
    Disabled,

    #[error("no such account")]
    NotFound,

    #[error("credential service error: {0}")]
    Other(String),
}

/// The external identity service consumed by the gateway.
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn create_credential(&self, email: &str, password: &str)
        -> Result<UserId, CredentialError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, CredentialError>;

    async fn sign_out(&self) -> Result<(), CredentialError>;

    fn current_user(&self) -> Option<UserId>;

    async fn update_display_name(&self, user: &UserId, name: &str)
        -> Result<(), CredentialError>;
}

/// Wraps identity creation and sign-in with fail-fast validation, bounded
/// retries and presence bookkeeping.  All other components assume a
/// session established here.
pub struct AuthGateway<C> {
    ctx: ChatContext,
    credentials: C,
    presence: Presence,
}

impl<C: CredentialService> AuthGateway<C> {
    pub fn new(ctx: ChatContext, credentials: C) -> Self {
        let presence = Presence::new(ctx.clone());
        Self {
            ctx,
            credentials,
            presence,
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// The signed-in user, or `None` before authentication.
    pub fn current_user(&self) -> Option<UserId> {
        self.ctx.current_user()
    }

    /// Create an account and open a session.
    ///
    /// Validation failures surface before any credential-service attempt.
    /// The display-name assignment is attempted afterwards but its failure
    /// is non-fatal: the account exists and is usable either way.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserId, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        let user_id = self
            .retrying("account creation", || {
                self.credentials.create_credential(email, password)
            })
            .await?;

        if let Err(e) = self.credentials.update_display_name(&user_id, display_name).await {
            tracing::warn!(user = %user_id, error = %e, "display name assignment failed");
        }

        self.provision(&user_id, display_name, email);
        self.open_session(user_id.clone());
        tracing::info!(user = %user_id, "account created");
        Ok(user_id)
    }

    /// Sign in and open a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        let user_id = self
            .retrying("sign-in", || self.credentials.sign_in(email, password))
            .await?;

        let fallback_name = email.split('@').next().unwrap_or(email);
        self.provision(&user_id, fallback_name, email);
        self.open_session(user_id.clone());
        tracing::info!(user = %user_id, "signed in");
        Ok(user_id)
    }

    /// Mark presence offline, invalidate the credential session and clear
    /// the local one.  Sign-out proceeds even when the presence write or
    /// the credential service fail.
    pub async fn sign_out(&self) {
        if let Some(user) = self.ctx.current_user() {
            self.presence.set_online(&user, false);
        }
        if let Err(e) = self.credentials.sign_out().await {
            tracing::warn!(error = %e, "credential sign-out failed");
        }
        self.ctx.session().set(None);
        tracing::info!("signed out");
    }

    /// Create the user document on first reference.
    fn provision(&self, user_id: &UserId, display_name: &str, email: &str) {
        let user = User::new(user_id.clone(), display_name, email);
        if let Err(e) = self.ctx.store().create_user_if_absent(user) {
            tracing::warn!(user = %user_id, error = %e, "user document provisioning failed");
        }
    }

    fn open_session(&self, user_id: UserId) {
        self.ctx.session().set(Some(user_id.clone()));
        self.presence.set_online(&user_id, true);
    }

    /// Run a credential-service call with up to [`AUTH_ATTEMPTS`] attempts
    /// separated by [`AUTH_RETRY_PAUSE`].  Only the final failure is
    /// surfaced, classified for the caller.
    async fn retrying<T, F, Fut>(&self, what: &'static str, op: F) -> Result<T, AuthError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CredentialError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < AUTH_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "{what} attempt failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(AUTH_RETRY_PAUSE).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "{what} failed after {attempt} attempts");
                    return Err(classify(e));
                }
            }
        }
    }
}

/// Map a credential-service failure to its fixed user-facing message.
fn classify(error: CredentialError) -> AuthError {
    match error {
        CredentialError::Network => AuthError::Network,
        CredentialError::EmailInUse => AuthError::DuplicateAccount,
        CredentialError::WeakCredential => AuthError::WeakCredential,
        CredentialError::Malformed => AuthError::MalformedInput,
        CredentialError::Disabled => AuthError::AccountDisabled,
        CredentialError::NotFound => AuthError::AccountNotFound,
        CredentialError::Other(_) => AuthError::Unclassified,
    }
}

// ---------------------------------------------------------------------------
// In-process credential service
// ---------------------------------------------------------------------------

struct Account {
    user_id: UserId,
    password: String,
    display_name: Option<String>,
    disabled: bool,
}

/// In-process [`CredentialService`] keyed by email.
///
/// Wrong-password and unknown-email sign-ins both report
/// [`CredentialError::NotFound`] so the service is not an email oracle.
#[derive(Default)]
pub struct MemoryCredentials {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<UserId>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Administratively disable an account.
    pub fn disable(&self, email: &str) {
        if let Ok(mut accounts) = self.accounts.lock() {
            if let Some(account) = accounts.get_mut(email) {
                account.disabled = true;
            }
        }
    }
}

#[async_trait]
impl CredentialService for MemoryCredentials {
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserId, CredentialError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| CredentialError::Other("account table poisoned".to_string()))?;
        if accounts.contains_key(email) {
            return Err(CredentialError::EmailInUse);
        }

        let user_id = UserId(Uuid::new_v4().to_string());
        accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
                display_name: None,
                disabled: false,
            },
        );
        drop(accounts);

        if let Ok(mut current) = self.current.lock() {
            *current = Some(user_id.clone());
        }
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, CredentialError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| CredentialError::Other("account table poisoned".to_string()))?;
        let account = accounts.get(email).ok_or(CredentialError::NotFound)?;
        if account.disabled {
            return Err(CredentialError::Disabled);
        }
        if account.password != password {
            return Err(CredentialError::NotFound);
        }

        let user_id = account.user_id.clone();
        drop(accounts);

        if let Ok(mut current) = self.current.lock() {
            *current = Some(user_id.clone());
        }
        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<(), CredentialError> {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        self.current
            .lock()
            .map(|current| current.clone())
            .unwrap_or(None)
    }

    async fn update_display_name(
        &self,
        user: &UserId,
        name: &str,
    ) -> Result<(), CredentialError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| CredentialError::Other("account table poisoned".to_string()))?;
        let account = accounts
            .values_mut()
            .find(|a| a.user_id == *user)
            .ok_or(CredentialError::NotFound)?;
        account.display_name = Some(name.to_string());
        Ok(())
    }
}
