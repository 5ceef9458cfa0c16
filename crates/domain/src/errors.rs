//! Error types used throughout the application
//!
//! Failures are split by the collaborator that produced them. Identity errors
//! are surfaced verbatim to command callers; store errors stay inside the
//! reconciliation cycle; `ProfileSyncError` covers everything else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Identity provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Identity configuration error: {0}")]
    Config(String),
}

/// Failures reported by the profile store
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
    /// No profile exists for the requested id
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// A profile with the same id already exists (creation race)
    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    #[error("Profile store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is the expected "no such record" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Main error type for ProfileSync
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ProfileSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ProfileSync operations
pub type Result<T> = std::result::Result<T, ProfileSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_is_detected() {
        assert!(StoreError::NotFound("u1".into()).is_not_found());
        assert!(!StoreError::AlreadyExists("u1".into()).is_not_found());
        assert!(!StoreError::Backend("boom".into()).is_not_found());
    }

    #[test]
    fn identity_error_converts_transparently() {
        let err: ProfileSyncError = IdentityError::AlreadyRegistered.into();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[test]
    fn errors_serialize_with_tag() {
        let json = serde_json::to_value(StoreError::NotFound("u1".into())).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "u1");
    }
}
