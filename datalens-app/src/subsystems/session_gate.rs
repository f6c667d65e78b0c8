//! Session gate: the single consumer of the identity provider's state stream.
//!
//! Every auth-state emission re-runs the full routing decision:
//! - signed out → auth screen
//! - signed in, backend unreachable → landing, "Backend Offline"
//! - signed in, backend holds no tables (or refuses) → landing
//! - signed in, backend holds tables → dashboard, plus a full registry refresh
//!
//! The only state kept between emissions is the last-seen session.

use std::sync::Arc;
use std::time::Duration;

use datalens_core::config::BootstrapConfig;
use datalens_core::{ApiClient, AuthError, AuthStateStream, Identity, IdentityProvider};
use futures::StreamExt;
use tokio::sync::watch;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use super::chat::ChatSession;
use super::table_registry::TableRegistry;
use super::view_router::{Pane, View};
use super::{StatusLevel, StatusLine};
use crate::interaction::Interaction;

const SIGN_OUT_PROMPT: &str = "Sign out and clear current data session?";
const EXIT_PROMPT: &str = "Are you sure you want to exit? This will clear all session data.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub has_remote_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInMethod {
    Password { email: String, password: String },
    SignUp { email: String, password: String },
    Popup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    Cancelled,
    SignedOut,
    ProviderFailed(String),
    ResetFailed(String),
}

pub struct SessionGate {
    api: ApiClient,
    provider: Arc<dyn IdentityProvider>,
    registry: Arc<TableRegistry>,
    chat: Arc<ChatSession>,
    interaction: Arc<dyn Interaction>,
    bootstrap: BootstrapConfig,
    session: watch::Sender<Option<Session>>,
    status: watch::Sender<StatusLine>,
    auth_error: watch::Sender<Option<String>>,
}

impl SessionGate {
    pub fn new(
        api: ApiClient,
        provider: Arc<dyn IdentityProvider>,
        registry: Arc<TableRegistry>,
        chat: Arc<ChatSession>,
        interaction: Arc<dyn Interaction>,
        bootstrap: BootstrapConfig,
    ) -> Self {
        Self {
            api,
            provider,
            registry,
            chat,
            interaction,
            bootstrap,
            session: watch::channel(None).0,
            status: watch::channel(StatusLine::default()).0,
            auth_error: watch::channel(None).0,
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn status(&self) -> StatusLine {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusLine> {
        self.status.subscribe()
    }

    /// Provider error text from the last auth action, shown verbatim.
    pub fn auth_error(&self) -> Option<String> {
        self.auth_error.borrow().clone()
    }

    fn set_status(&self, text: impl Into<String>, level: StatusLevel) {
        self.status.send_replace(StatusLine::new(text, level));
    }

    // ------------------------------------------------------------------------
    // Auth-state stream
    // ------------------------------------------------------------------------

    /// Subscribe to the provider, retrying at a fixed interval while it is
    /// not ready.
    pub async fn attach(&self) -> Result<AuthStateStream, AuthError> {
        let interval = FixedInterval::from_millis(self.bootstrap.init_retry_ms);
        let strategy: Box<dyn Iterator<Item = Duration> + Send> =
            match self.bootstrap.max_init_attempts {
                Some(max) => Box::new(interval.take(max.saturating_sub(1))),
                None => Box::new(interval),
            };

        Retry::spawn(strategy, move || async move {
            let result = self.provider.subscribe().await;
            if let Err(e) = &result {
                tracing::warn!(
                    provider = self.provider.name(),
                    error = %e,
                    retry_ms = self.bootstrap.init_retry_ms,
                    "Identity provider not ready, retrying"
                );
            }
            result
        })
        .await
    }

    /// Consume auth-state emissions until the provider closes the stream.
    pub async fn run(&self) -> Result<(), AuthError> {
        self.set_status("Checking Session...", StatusLevel::Idle);
        let mut stream = self.attach().await?;

        while let Some(identity) = stream.next().await {
            self.handle_auth_state(identity).await;
        }

        tracing::info!("Auth-state stream closed");
        Ok(())
    }

    /// Route for one auth-state emission. Returns the view chosen.
    pub async fn handle_auth_state(&self, identity: Option<Identity>) -> View {
        let Some(identity) = identity else {
            tracing::info!("No user signed in");
            self.session.send_replace(None);
            self.set_status("Awaiting Login", StatusLevel::Idle);
            self.registry.navigate(View::Auth);
            return View::Auth;
        };

        tracing::info!(user = %identity.label(), "User authenticated");
        let welcome = format!("Welcome back, {}", identity.label());
        self.session.send_replace(Some(Session {
            identity,
            has_remote_data: false,
        }));
        self.set_status("Initializing...", StatusLevel::Pending);

        match self.api.dashboard().await {
            Ok(summary) if summary.total_tables > 0 => {
                self.session.send_modify(|s| {
                    if let Some(s) = s.as_mut() {
                        s.has_remote_data = true;
                    }
                });
                self.set_status(welcome, StatusLevel::Ready);
                self.registry.publish_total_tables(summary.total_tables);
                let view = View::Application(Pane::Dashboard);
                self.registry.navigate(view);
                self.registry.refresh_all().await;
                view
            }
            Ok(_) => self.await_dataset(),
            Err(e) if e.is_transport() => {
                tracing::error!(error = %e, "Session check could not reach the backend");
                self.set_status("Backend Offline", StatusLevel::Error);
                self.registry.navigate(View::Landing);
                View::Landing
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session check rejected by the backend");
                self.await_dataset()
            }
        }
    }

    fn await_dataset(&self) -> View {
        self.set_status("Awaiting Multi-File Dataset", StatusLevel::Pending);
        self.registry.navigate(View::Landing);
        View::Landing
    }

    // ------------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------------

    /// Run an auth action. View changes arrive through the state stream;
    /// failures land on the auth error surface.
    pub async fn sign_in(&self, method: SignInMethod) -> Result<(), AuthError> {
        self.auth_error.send_replace(None);

        let result = match &method {
            SignInMethod::Password { email, password } => {
                self.provider.sign_in_with_password(email, password).await
            }
            SignInMethod::SignUp { email, password } => self.provider.sign_up(email, password).await,
            SignInMethod::Popup => self.provider.sign_in_with_popup().await,
        };

        if let Err(e) = &result {
            tracing::warn!(provider = self.provider.name(), error = %e, "Auth action failed");
            self.auth_error.send_replace(Some(e.to_string()));
        }
        result
    }

    /// Skip authentication and go straight to the landing screen.
    pub fn continue_as_guest(&self) {
        tracing::info!("Guest login selected");
        self.registry.navigate(View::Landing);
    }

    /// Confirm, sign out of the provider, then (unless `keep_remote_data`)
    /// clear the backend session. This call routes to auth and clears client
    /// state only once the reset succeeded or was skipped. The provider's own
    /// signed-out emission still reaches `run()` and routes to auth there.
    pub async fn sign_out(&self, keep_remote_data: bool) -> SignOutOutcome {
        if !self.interaction.confirm(SIGN_OUT_PROMPT).await {
            return SignOutOutcome::Cancelled;
        }

        if let Err(e) = self.provider.sign_out().await {
            tracing::error!(error = %e, "Provider sign-out failed");
            self.interaction.alert(&e.to_string());
            return SignOutOutcome::ProviderFailed(e.to_string());
        }

        if !keep_remote_data {
            if let Err(message) = self.reset_backend().await {
                return SignOutOutcome::ResetFailed(message);
            }
        }

        self.clear_client_state();
        self.registry.navigate(View::Auth);
        SignOutOutcome::SignedOut
    }

    /// Clear server-held data and the client state that mirrors it, keeping
    /// the current identity. Returns `false` if cancelled or the reset failed.
    pub async fn reset_session(&self, skip_confirm: bool) -> bool {
        if !skip_confirm && !self.interaction.confirm(EXIT_PROMPT).await {
            return false;
        }
        if self.reset_backend().await.is_err() {
            return false;
        }
        self.registry.reset();
        self.chat.clear();
        self.session.send_modify(|s| {
            if let Some(s) = s.as_mut() {
                s.has_remote_data = false;
            }
        });
        true
    }

    async fn reset_backend(&self) -> Result<(), String> {
        match self.api.reset().await {
            Ok(()) => {
                tracing::info!("Backend session reset");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Reset error");
                let message = format!("Failed to reset session: {}", e);
                self.interaction.alert(&message);
                Err(message)
            }
        }
    }

    fn clear_client_state(&self) {
        self.registry.reset();
        self.chat.clear();
        self.session.send_replace(None);
    }
}
