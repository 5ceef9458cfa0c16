//! Hosted backend error bodies
//!
//! The auth endpoints and the REST endpoints report failures with different
//! JSON shapes. [`ApiErrorBody`] accepts either and the mapping functions turn
//! them into the domain taxonomy.

use profilesync_domain::{IdentityError, StoreError};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// PostgREST: a single object was requested but zero rows matched
pub const PGRST_NO_ROWS: &str = "PGRST116";
/// Postgres `unique_violation`
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Union of the auth (`error`/`error_description`, `error_code`/`msg`) and
/// REST (`code`/`message`/`details`) error shapes
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Numeric on auth endpoints, string on REST endpoints
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiErrorBody {
    /// Parse a response body; non-JSON bodies are kept as the message.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            message: Some(raw.trim().to_string()).filter(|m| !m.is_empty()),
            ..Self::default()
        })
    }

    /// String-valued error code, if any
    pub fn code(&self) -> Option<&str> {
        self.code.as_ref().and_then(Value::as_str).or(self.error_code.as_deref())
    }

    /// Best human-readable description available
    pub fn message(&self) -> String {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("no error message")
            .to_string()
    }
}

/// Map an auth endpoint failure
pub fn identity_error(status: StatusCode, body: &ApiErrorBody) -> IdentityError {
    let message = body.message();
    let lowered = message.to_ascii_lowercase();

    if body.error.as_deref() == Some("invalid_grant")
        || body.error_code.as_deref() == Some("invalid_credentials")
        || lowered.contains("invalid login credentials")
    {
        return IdentityError::InvalidCredentials;
    }

    if matches!(body.error_code.as_deref(), Some("user_already_exists" | "email_exists"))
        || lowered.contains("already registered")
    {
        return IdentityError::AlreadyRegistered;
    }

    match status.as_u16() {
        401 => IdentityError::NotAuthenticated,
        429 | 500..=599 => IdentityError::Network(format!("HTTP {}: {message}", status.as_u16())),
        code => IdentityError::Provider { status: code, message },
    }
}

/// Map a REST endpoint failure for the row keyed by `id`
pub fn store_error(status: StatusCode, body: &ApiErrorBody, id: &str) -> StoreError {
    let code = body.code();

    if code == Some(PGRST_NO_ROWS) || (status == StatusCode::NOT_ACCEPTABLE && code.is_none()) {
        return StoreError::NotFound(id.to_string());
    }

    if code == Some(PG_UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
        return StoreError::AlreadyExists(id.to_string());
    }

    StoreError::Backend(format!("HTTP {}: {}", status.as_u16(), body.message()))
}
