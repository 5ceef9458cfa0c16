//! User profile types
//!
//! Application-owned profile record, keyed by the identity provider's
//! principal id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::Principal;
use crate::constants::FALLBACK_USERNAME;
use crate::impl_domain_enum_conversions;

/// Application role attached to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl_domain_enum_conversions!(Role {
    Admin => "admin",
    User => "user",
});

/// User profile stored in the profile store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the owning principal's id
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Build the record created for a principal that has no profile yet.
    ///
    /// A non-blank `suggested_username` wins; otherwise the username is the
    /// email local part, or [`FALLBACK_USERNAME`] when that is empty.
    pub fn candidate(
        principal: &Principal,
        suggested_username: Option<&str>,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Self {
        let username = suggested_username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| derive_username(principal.email.as_deref()), ToOwned::to_owned);

        Self {
            id: principal.id.clone(),
            username,
            email: principal.email.clone().unwrap_or_default(),
            role,
            created_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether two records agree on the fields that identify the owner.
    pub fn same_identity(&self, other: &Self) -> bool {
        self.id == other.id && self.email == other.email && self.role == other.role
    }
}

/// Username derived from an email address
pub fn derive_username(email: Option<&str>) -> String {
    email
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or(FALLBACK_USERNAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(email: Option<&str>) -> Principal {
        Principal::new("u1", email.map(ToOwned::to_owned))
    }

    #[test]
    fn candidate_uses_email_local_part() {
        let now = Utc::now();
        let profile = Profile::candidate(&principal(Some("alice@example.com")), None, Role::User, now);

        assert_eq!(profile.id, "u1");
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.created_at, now);
    }

    #[test]
    fn candidate_prefers_suggested_username() {
        let profile = Profile::candidate(
            &principal(Some("alice@example.com")),
            Some("  ally "),
            Role::User,
            Utc::now(),
        );
        assert_eq!(profile.username, "ally");
    }

    #[test]
    fn blank_suggestion_falls_back_to_email() {
        let profile =
            Profile::candidate(&principal(Some("bob@example.com")), Some("   "), Role::User, Utc::now());
        assert_eq!(profile.username, "bob");
    }

    #[test]
    fn missing_email_yields_fallback_username() {
        let profile = Profile::candidate(&principal(None), None, Role::User, Utc::now());
        assert_eq!(profile.username, FALLBACK_USERNAME);
        assert_eq!(profile.email, "");
    }

    #[test]
    fn empty_local_part_yields_fallback_username() {
        assert_eq!(derive_username(Some("@example.com")), FALLBACK_USERNAME);
        assert_eq!(derive_username(Some("")), FALLBACK_USERNAME);
        assert_eq!(derive_username(Some("no-at-sign")), "no-at-sign");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        assert_eq!(serde_json::from_value::<Role>("user".into()).unwrap(), Role::User);
    }

    #[test]
    fn same_identity_ignores_username_and_timestamp() {
        let a = Profile::candidate(&principal(Some("a@x.io")), Some("first"), Role::User, Utc::now());
        let mut b = a.clone();
        b.username = "second".into();
        b.created_at = Utc::now() + chrono::Duration::seconds(5);
        assert!(a.same_identity(&b));

        b.role = Role::Admin;
        assert!(!a.same_identity(&b));
    }
}
