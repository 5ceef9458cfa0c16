//! Hosted backend adapters
//!
//! GoTrue-compatible identity endpoints live under `auth/v1/` and the
//! PostgREST-compatible profile table under `rest/v1/`, both below one base
//! URL that is authorised with a public API key.

pub mod auth;
pub mod errors;
pub mod identity;
pub mod profile_store;

use std::time::Duration;

use profilesync_domain::{IdentityConfig, ProfileSyncError};
use url::Url;

pub use auth::AccessTokenProvider;
pub use errors::{identity_error, store_error, ApiErrorBody};
pub use identity::HttpIdentityService;
pub use profile_store::RestProfileStore;

use crate::http::HttpClient;

/// Header carrying the public API key on every request
pub const API_KEY_HEADER: &str = "apikey";

/// Base URL and public key of the hosted backend
#[derive(Clone)]
pub struct BackendEndpoint {
    base: Url,
    anon_key: String,
    timeout: Duration,
}

impl BackendEndpoint {
    /// # Errors
    /// `ProfileSyncError::Config` if the URL does not parse.
    pub fn new(api_url: &str, anon_key: impl Into<String>) -> Result<Self, ProfileSyncError> {
        let mut raw = api_url.trim().to_string();
        // `Url::join` replaces the last segment unless the base ends with '/'.
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|err| ProfileSyncError::Config(format!("invalid identity.api_url: {err}")))?;

        Ok(Self { base, anon_key: anon_key.into(), timeout: Duration::from_secs(30) })
    }

    /// # Errors
    /// `ProfileSyncError::Config` when the URL or key is missing or invalid.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, ProfileSyncError> {
        let api_url = config
            .api_url
            .as_deref()
            .ok_or_else(|| ProfileSyncError::Config("identity.api_url is not set".into()))?;
        let anon_key = config
            .anon_key
            .as_deref()
            .ok_or_else(|| ProfileSyncError::Config("identity.anon_key is not set".into()))?;

        Ok(Self::new(api_url, anon_key)?
            .with_timeout(Duration::from_secs(config.request_timeout_secs)))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Resolve `path` (no leading slash) against the base URL.
    ///
    /// # Errors
    /// `ProfileSyncError::Config` if the joined URL is invalid.
    pub fn url(&self, path: &str) -> Result<Url, ProfileSyncError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ProfileSyncError::Config(format!("invalid endpoint path {path}: {err}")))
    }

    /// HTTP client that sends the API key with every request.
    ///
    /// # Errors
    /// `ProfileSyncError::Config` if the key is not a valid header value.
    pub fn http_client(&self) -> Result<HttpClient, ProfileSyncError> {
        HttpClient::builder()
            .timeout(self.timeout)
            .sensitive_header(API_KEY_HEADER, &self.anon_key)?
            .build()
    }
}

impl std::fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEndpoint")
            .field("base", &self.base.as_str())
            .field("anon_key", &"[redacted]")
            .field("timeout", &self.timeout)
            .finish()
    }
}
