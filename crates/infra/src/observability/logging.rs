//! Tracing subscriber initialisation

use profilesync_domain::{LoggingConfig, ProfileSyncError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
///
/// # Errors
/// Returns `ProfileSyncError::Config` when the configured level is not a
/// valid filter directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.trim()).map_err(|err| {
        ProfileSyncError::Config(format!("invalid log level '{}': {err}", config.level))
    })
}

/// Install the global tracing subscriber.
///
/// Plain text by default, one JSON object per line when `config.json` is set.
///
/// # Errors
/// Returns `ProfileSyncError::Config` for an invalid level and
/// `ProfileSyncError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|err| {
        ProfileSyncError::Internal(format!("failed to install tracing subscriber: {err}"))
    })?;

    tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
    Ok(())
}
