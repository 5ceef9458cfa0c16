//! Best-effort provisioning of the administrative account
//!
//! Runs once per process. Every failure is logged and swallowed; the outcome
//! is returned only so callers and tests can observe what happened.

use std::sync::Arc;

use profilesync_domain::{AdminSeedConfig, IdentityError, Profile, Role};
use tracing::{info, warn};

use crate::identity::ports::IdentityService;
use crate::user::ports::ProfileStore;
use crate::user::provisioner::{with_fallback_email, ProfileProvisioner};

/// Fixed administrative credential to register
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl AdminCredentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self { email: email.into(), password: password.into(), username: username.into() }
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("username", &self.username)
            .finish()
    }
}

/// What a seeding attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Account registered; carries the admin profile now visible in the store
    /// (or the local fallback if the store could not be read back)
    Created(Profile),
    /// Account existed before this run; nothing was written
    AlreadyRegistered,
    /// Sign-up failed for another reason; nothing was written
    Failed(IdentityError),
}

/// Registers the administrative account and its admin profile
#[derive(Clone)]
pub struct BootstrapSeeder {
    identity: Arc<dyn IdentityService>,
    provisioner: ProfileProvisioner,
    credentials: AdminCredentials,
}

impl BootstrapSeeder {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn ProfileStore>,
        credentials: AdminCredentials,
    ) -> Self {
        Self { identity, provisioner: ProfileProvisioner::new(store), credentials }
    }

    /// Build a seeder from configuration; `None` when seeding is disabled.
    pub fn from_config(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn ProfileStore>,
        config: &AdminSeedConfig,
    ) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let credentials =
            AdminCredentials::new(&config.email, &config.password, &config.username);
        Some(Self::new(identity, store, credentials))
    }

    pub fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    /// Attempt to register the admin account. Never fails.
    pub async fn run(&self) -> SeedOutcome {
        let email = self.credentials.email.as_str();

        match self.identity.sign_up(email, &self.credentials.password).await {
            Ok(session) => {
                let owner = with_fallback_email(&session.principal, email);
                let ensured = self
                    .provisioner
                    .ensure_profile(&owner, Some(&self.credentials.username), Role::Admin)
                    .await;
                info!(
                    principal_id = %ensured.profile.id,
                    email,
                    inserted = ensured.inserted,
                    "admin account seeded"
                );
                SeedOutcome::Created(ensured.profile)
            }
            Err(IdentityError::AlreadyRegistered) => {
                info!(email, "admin account already registered; skipping seed");
                SeedOutcome::AlreadyRegistered
            }
            Err(err) => {
                warn!(email, error = %err, "admin seeding failed; continuing without it");
                SeedOutcome::Failed(err)
            }
        }
    }
}

impl std::fmt::Debug for BootstrapSeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapSeeder").field("credentials", &self.credentials).finish()
    }
}
