//! Identity provider seam.
//!
//! Authentication is delegated to an external provider. The orchestrator only
//! needs a state-change subscription plus the sign-in/sign-up/sign-out calls;
//! provider error text is shown to the user verbatim.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// Signed-in user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name, else email, else the opaque uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Provider-reported failure; the message is user-facing.
    #[error("{0}")]
    Provider(String),

    #[error("Identity provider not ready: {0}")]
    NotReady(String),
}

/// Every emission carries the current identity or its absence.
pub type AuthStateStream = Pin<Box<dyn Stream<Item = Option<Identity>> + Send>>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to auth-state changes. The first item is the current state.
    async fn subscribe(&self) -> Result<AuthStateStream, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Federated popup flow.
    async fn sign_in_with_popup(&self) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// LocalIdentityProvider
// ============================================================================

const MIN_PASSWORD_LEN: usize = 6;

/// In-process provider for development and tests: accounts live in memory
/// and the state stream is backed by a `watch` channel.
pub struct LocalIdentityProvider {
    state: watch::Sender<Option<Identity>>,
    accounts: Mutex<HashMap<String, (String, Identity)>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Start already signed in as `identity`.
    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::new();
        provider.state.send_replace(Some(identity));
        provider
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn subscribe(&self) -> Result<AuthStateStream, AuthError> {
        let rx = self.state.subscribe();
        let stream = futures::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let current = rx.borrow_and_update().clone();
            Some((current, (rx, false)))
        });
        Ok(Box::pin(stream))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let accounts = self.accounts.lock().await;
        match accounts.get(email) {
            Some((stored, identity)) if stored == password => {
                self.state.send_replace(Some(identity.clone()));
                tracing::info!(email = %email, "Local sign-in succeeded");
                Ok(())
            }
            _ => Err(AuthError::Provider(
                "Invalid email or password (auth/invalid-credential).".to_string(),
            )),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if !email.contains('@') {
            return Err(AuthError::Provider(
                "The email address is badly formatted (auth/invalid-email).".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Provider(format!(
                "Password should be at least {} characters (auth/weak-password).",
                MIN_PASSWORD_LEN
            )));
        }

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(AuthError::Provider(
                "The email address is already in use (auth/email-already-in-use).".to_string(),
            ));
        }

        let identity = Identity::new(uuid::Uuid::new_v4().to_string()).with_email(email);
        accounts.insert(email.to_string(), (password.to_string(), identity.clone()));
        self.state.send_replace(Some(identity));
        tracing::info!(email = %email, "Local account created");
        Ok(())
    }

    async fn sign_in_with_popup(&self) -> Result<(), AuthError> {
        let identity = Identity::new("local-federated").with_display_name("Local User");
        self.state.send_replace(Some(identity));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.send_replace(None);
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
