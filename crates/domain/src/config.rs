//! Configuration structures
//!
//! Every section has defaults so a partial file (or none at all) yields a
//! usable development setup: in-memory identity and profile store, admin
//! seeding enabled, `info` logging.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, DEFAULT_POOL_SIZE,
    DEFAULT_PROFILE_TABLE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SQLITE_PATH,
};
use crate::errors::{ProfileSyncError, Result};
use crate::impl_domain_enum_conversions;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub store: StoreConfig,
    pub admin_seed: AdminSeedConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject combinations that cannot be wired into a running context.
    ///
    /// # Errors
    /// Returns `ProfileSyncError::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let needs_api = self.identity.backend == IdentityBackend::Http
            || self.store.backend == StoreBackend::Rest;

        if needs_api {
            if is_blank(self.identity.api_url.as_deref()) {
                return Err(ProfileSyncError::Config(
                    "identity.api_url is required for http identity or rest store".into(),
                ));
            }
            if is_blank(self.identity.anon_key.as_deref()) {
                return Err(ProfileSyncError::Config(
                    "identity.anon_key is required for http identity or rest store".into(),
                ));
            }
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.sqlite_path.trim().is_empty() {
            return Err(ProfileSyncError::Config(
                "store.sqlite_path is required for the sqlite store".into(),
            ));
        }

        if self.store.table.trim().is_empty() {
            return Err(ProfileSyncError::Config("store.table must not be empty".into()));
        }

        if self.admin_seed.enabled
            && (self.admin_seed.email.trim().is_empty() || self.admin_seed.password.is_empty())
        {
            return Err(ProfileSyncError::Config(
                "admin_seed.email and admin_seed.password are required when seeding is enabled"
                    .into(),
            ));
        }

        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Which identity service adapter to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    #[default]
    Memory,
    Http,
}

impl_domain_enum_conversions!(IdentityBackend {
    Memory => "memory",
    Http => "http",
});

/// Which profile store adapter to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
    Rest,
}

impl_domain_enum_conversions!(StoreBackend {
    Memory => "memory",
    Sqlite => "sqlite",
    Rest => "rest",
});

/// Identity service connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    /// Base URL of the hosted backend (auth and rest endpoints live below it)
    pub api_url: Option<String>,
    /// Public API key sent with every request
    pub anon_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            backend: IdentityBackend::default(),
            api_url: None,
            anon_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("backend", &self.backend)
            .field("api_url", &self.api_url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "[redacted]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Profile store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: String,
    pub pool_size: u32,
    /// Table holding profile rows (sqlite and rest backends)
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: DEFAULT_SQLITE_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            table: DEFAULT_PROFILE_TABLE.to_string(),
        }
    }
}

/// Administrative account provisioned at start-up
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSeedConfig {
    pub enabled: bool,
    pub email: String,
    pub password: String,
    pub username: String,
}

impl Default for AdminSeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            username: DEFAULT_ADMIN_USERNAME.to_string(),
        }
    }
}

impl std::fmt::Debug for AdminSeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeedConfig")
            .field("enabled", &self.enabled)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("username", &self.username)
            .finish()
    }
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
