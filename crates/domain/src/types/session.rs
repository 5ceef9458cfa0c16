//! Identity provider session types
//!
//! Sessions are owned by the identity provider; the application only
//! observes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_enum_conversions;

/// Identity-provider user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self { id: id.into(), email }
    }
}

/// Opaque session issued by the identity provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub principal: Principal,
}

impl Session {
    pub fn new(access_token: impl Into<String>, principal: Principal) -> Self {
        Self { access_token: access_token.into(), refresh_token: None, expires_at: None, principal }
    }

    /// Whether the session has passed its expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires_at", &self.expires_at)
            .field("principal", &self.principal)
            .finish()
    }
}

/// Kind of session transition reported by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl_domain_enum_conversions!(SessionEventKind {
    InitialSession => "initial_session",
    SignedIn => "signed_in",
    SignedOut => "signed_out",
    TokenRefreshed => "token_refreshed",
    UserUpdated => "user_updated",
    PasswordRecovery => "password_recovery",
});

/// Session-change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(SessionEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(SessionEventKind::SignedOut, None)
    }

    /// Principal carried by the event's session, if any
    pub fn principal(&self) -> Option<&Principal> {
        self.session.as_ref().map(|session| &session.principal)
    }
}
