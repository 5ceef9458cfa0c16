//! Profile provisioning
//!
//! Single creation path used by lazy reconciliation, explicit sign-up and the
//! bootstrap seeder, so all three produce structurally identical records.

use std::sync::Arc;

use chrono::Utc;
use profilesync_domain::{Principal, Profile, Role, StoreError};
use tracing::{debug, error, info, warn};

use super::ports::ProfileStore;

/// Where the returned profile came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Read back from the profile store
    Stored,
    /// Built locally because the store could not be read back
    Fallback,
}

/// Result of [`ProfileProvisioner::ensure_profile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredProfile {
    pub profile: Profile,
    pub origin: ProfileOrigin,
    /// Whether this call's insert was accepted by the store
    pub inserted: bool,
}

/// Creates profiles and tolerates concurrent creators
#[derive(Clone)]
pub struct ProfileProvisioner {
    store: Arc<dyn ProfileStore>,
}

impl ProfileProvisioner {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Make sure a profile exists for `principal` and return it.
    ///
    /// Inserts a candidate record, then re-reads the store. An insert that
    /// fails (including a concurrent creator winning the race) still
    /// proceeds to the re-read. If the re-read fails as well, the locally
    /// built candidate is returned. Never fails.
    pub async fn ensure_profile(
        &self,
        principal: &Principal,
        suggested_username: Option<&str>,
        role: Role,
    ) -> EnsuredProfile {
        let candidate = Profile::candidate(principal, suggested_username, role, Utc::now());

        let inserted = match self.store.insert(&candidate).await {
            Ok(()) => {
                info!(principal_id = %candidate.id, role = %role, "profile created");
                true
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(principal_id = %candidate.id, "profile already exists; creation race resolved");
                false
            }
            Err(err) => {
                error!(principal_id = %candidate.id, error = %err, "failed to create profile");
                false
            }
        };

        match self.store.get_by_id(&candidate.id).await {
            Ok(stored) => {
                if !stored.same_identity(&candidate) {
                    warn!(
                        principal_id = %stored.id,
                        stored_role = %stored.role,
                        requested_role = %candidate.role,
                        "existing profile differs from requested one; keeping stored record"
                    );
                }
                EnsuredProfile { profile: stored, origin: ProfileOrigin::Stored, inserted }
            }
            Err(err) => {
                warn!(
                    principal_id = %candidate.id,
                    error = %err,
                    "failed to re-read profile; using locally built record"
                );
                EnsuredProfile { profile: candidate, origin: ProfileOrigin::Fallback, inserted }
            }
        }
    }
}

/// Copy of `principal` whose email falls back to `email` when absent.
pub fn with_fallback_email(principal: &Principal, email: &str) -> Principal {
    let email = principal
        .email
        .clone()
        .filter(|existing| !existing.is_empty())
        .or_else(|| Some(email.to_string()).filter(|e| !e.is_empty()));
    Principal { id: principal.id.clone(), email }
}
