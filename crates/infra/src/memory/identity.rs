//! In-process identity provider
//!
//! Development and test stand-in for a hosted identity service. Passwords are
//! kept as salted SHA-256 digests; this is not a security boundary.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use profilesync_core::{IdentityService, SessionSubscription};
use profilesync_domain::constants::SESSION_EVENT_CAPACITY;
use profilesync_domain::{IdentityError, Principal, Session, SessionEvent, SessionEventKind};
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_TTL_SECS: i64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    principal: Principal,
    salt: String,
    password_digest: String,
}

/// Identity service holding accounts and the current session in memory
pub struct InMemoryIdentityService {
    accounts: DashMap<String, Account>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for InMemoryIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { accounts: DashMap::new(), current: RwLock::new(None), events }
    }

    /// Number of live session-change subscriptions
    pub fn receiver_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Issue a fresh token for the current session.
    ///
    /// # Errors
    /// `IdentityError::NotAuthenticated` when no session is active.
    pub fn refresh_session(&self) -> Result<Session, IdentityError> {
        let refreshed = {
            let mut current = self.current.write();
            let session = current.as_ref().ok_or(IdentityError::NotAuthenticated)?;
            let refreshed = issue_session(session.principal.clone());
            *current = Some(refreshed.clone());
            refreshed
        };
        self.emit(SessionEventKind::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    fn open_session(&self, principal: Principal) -> Session {
        let session = issue_session(principal);
        *self.current.write() = Some(session.clone());
        self.emit(SessionEventKind::SignedIn, Some(session.clone()));
        session
    }

    fn emit(&self, kind: SessionEventKind, session: Option<Session>) {
        // Sending fails only when nobody is subscribed.
        if self.events.send(SessionEvent::new(kind, session)).is_err() {
            debug!(kind = %kind, "session event dropped; no subscribers");
        }
    }
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let raw: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    hex::encode(raw)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn issue_session(principal: Principal) -> Session {
    let mut session = Session::new(random_hex(32), principal);
    session.refresh_token = Some(random_hex(16));
    session.expires_at = Some(Utc::now() + Duration::seconds(SESSION_TTL_SECS));
    session
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let current = self.current.read();
        Ok(current.as_ref().filter(|session| !session.is_expired_at(Utc::now())).cloned())
    }

    async fn get_current_principal(&self) -> Result<Option<Principal>, IdentityError> {
        Ok(self.get_session().await?.map(|session| session.principal))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let principal = {
            let account =
                self.accounts.get(&normalise_email(email)).ok_or(IdentityError::InvalidCredentials)?;
            if digest(&account.salt, password) != account.password_digest {
                return Err(IdentityError::InvalidCredentials);
            }
            account.principal.clone()
        };

        info!(principal_id = %principal.id, "signed in");
        Ok(self.open_session(principal))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalise_email(email);
        if !email.contains('@') {
            return Err(IdentityError::Provider {
                status: 422,
                message: "Unable to validate email address: invalid format".into(),
            });
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Provider {
                status: 422,
                message: format!("Password should be at least {MIN_PASSWORD_LEN} characters"),
            });
        }

        let principal = match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => return Err(IdentityError::AlreadyRegistered),
            Entry::Vacant(slot) => {
                let principal = Principal::new(Uuid::new_v4().to_string(), Some(email));
                let salt = random_hex(16);
                let password_digest = digest(&salt, password);
                slot.insert(Account { principal: principal.clone(), salt, password_digest });
                principal
            }
        };

        info!(principal_id = %principal.id, "account registered");
        Ok(self.open_session(principal))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let previous = self.current.write().take();
        if let Some(session) = previous {
            info!(principal_id = %session.principal.id, "signed out");
            self.emit(SessionEventKind::SignedOut, None);
        }
        Ok(())
    }

    fn on_session_change(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }
}
