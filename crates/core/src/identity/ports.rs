//! Port interfaces for the identity provider
//!
//! The provider owns sessions, credentials and token issuance. Core only
//! observes sessions and forwards credential commands.

use async_trait::async_trait;
use profilesync_domain::{IdentityError, Principal, Session, SessionEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Trait for identity provider operations
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Current session, if one is established
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Principal behind the current session, fetched fresh from the provider
    async fn get_current_principal(&self) -> Result<Option<Principal>, IdentityError>;

    /// Establish a session with email and password credentials
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    /// Register a new account; the provider signs the new principal in
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Register for session-change notifications.
    ///
    /// Dropping or calling [`SessionSubscription::unsubscribe`] on the
    /// returned handle ends the registration.
    fn on_session_change(&self) -> SessionSubscription;
}

type UnsubscribeHook = Box<dyn FnOnce() + Send>;

/// Live registration for session-change events
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
    on_unsubscribe: Option<UnsubscribeHook>,
}

impl SessionSubscription {
    pub fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { receiver, on_unsubscribe: None }
    }

    /// Run `hook` once when the subscription ends
    #[must_use]
    pub fn with_unsubscribe_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_unsubscribe = Some(Box::new(hook));
        self
    }

    /// Wait for the next session event.
    ///
    /// Returns `None` once the provider closes the stream. Lagging behind
    /// skips the overwritten events; the newest ones are still delivered.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session event subscriber lagged; older events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// End the registration explicitly
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for SessionSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSubscription")
            .field("pending", &self.receiver.len())
            .field("has_hook", &self.on_unsubscribe.is_some())
            .finish()
    }
}
