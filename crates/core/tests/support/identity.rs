//! Scripted identity provider
//!
//! Accounts are registered in memory; sign-in, sign-up and sign-out update
//! the current session and broadcast the matching event synchronously, the
//! way a hosted provider's client notifies its listeners.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use profilesync_core::{IdentityService, SessionSubscription};
use profilesync_domain::{IdentityError, Principal, Session, SessionEvent};
use tokio::sync::broadcast;

pub struct ScriptedIdentity {
    accounts: Mutex<HashMap<String, (String, Principal)>>,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    active_subscriptions: Arc<AtomicUsize>,
    sign_up_failure: Mutex<Option<IdentityError>>,
    current_principal_override: Mutex<Option<Option<Principal>>>,
}

impl Default for ScriptedIdentity {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events: broadcast::channel(32).0,
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
            sign_up_failure: Mutex::new(None),
            current_principal_override: Mutex::new(None),
        }
    }
}

impl ScriptedIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an account without signing it in or emitting anything
    pub fn register(&self, id: &str, email: &str, password: &str) {
        let principal = Principal::new(id, Some(email.to_string()));
        self.accounts.lock().insert(email.to_lowercase(), (password.to_string(), principal));
    }

    /// Start with `principal` already signed in (no event emitted)
    pub fn with_session(self: Arc<Self>, principal: Principal) -> Arc<Self> {
        *self.current.lock() = Some(session_for(&principal));
        self
    }

    pub fn fail_sign_up_with(&self, err: IdentityError) {
        *self.sign_up_failure.lock() = Some(err);
    }

    /// Force what `get_current_principal` reports, independent of the session
    pub fn report_current_principal(&self, principal: Option<Principal>) {
        *self.current_principal_override.lock() = Some(principal);
    }

    /// Broadcast an arbitrary event
    pub fn emit(&self, event: SessionEvent) {
        // No receivers is fine; nothing is listening yet.
        let _ = self.events.send(event);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }

    fn open_session(&self, principal: &Principal) -> Session {
        let session = session_for(principal);
        *self.current.lock() = Some(session.clone());
        self.emit(SessionEvent::signed_in(session.clone()));
        session
    }
}

fn session_for(principal: &Principal) -> Session {
    Session::new(format!("token-{}", principal.id), principal.clone())
}

#[async_trait]
impl IdentityService for ScriptedIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.current.lock().clone())
    }

    async fn get_current_principal(&self) -> Result<Option<Principal>, IdentityError> {
        if let Some(forced) = self.current_principal_override.lock().clone() {
            return Ok(forced);
        }
        Ok(self.current.lock().as_ref().map(|session| session.principal.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let principal = {
            let accounts = self.accounts.lock();
            match accounts.get(&email.to_lowercase()) {
                Some((stored, principal)) if stored == password => principal.clone(),
                _ => return Err(IdentityError::InvalidCredentials),
            }
        };
        Ok(self.open_session(&principal))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        if let Some(err) = self.sign_up_failure.lock().clone() {
            return Err(err);
        }
        let principal = {
            let mut accounts = self.accounts.lock();
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(IdentityError::AlreadyRegistered);
            }
            let principal = Principal::new(format!("id-{}", accounts.len() + 1), Some(key.clone()));
            accounts.insert(key, (password.to_string(), principal.clone()));
            principal
        };
        Ok(self.open_session(&principal))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.current.lock().take().is_none() {
            return Err(IdentityError::NotAuthenticated);
        }
        self.emit(SessionEvent::signed_out());
        Ok(())
    }

    fn on_session_change(&self) -> SessionSubscription {
        self.active_subscriptions.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&self.active_subscriptions);
        SessionSubscription::new(self.events.subscribe()).with_unsubscribe_hook(move || {
            counter.fetch_sub(1, Ordering::SeqCst);
        })
    }
}
