//! Configuration loader
//!
//! Loads application configuration from a config file and environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Read an optional `.env` file into the process environment
//! 2. Probe standard paths for a config file; use defaults if none exists
//! 3. Apply `PROFILESYNC_*` environment overrides on top
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `PROFILESYNC_IDENTITY_BACKEND`: `memory` or `http`
//! - `PROFILESYNC_API_URL`: Base URL of the hosted backend
//! - `PROFILESYNC_ANON_KEY`: Public API key
//! - `PROFILESYNC_REQUEST_TIMEOUT_SECS`: HTTP timeout in seconds
//! - `PROFILESYNC_STORE_BACKEND`: `memory`, `sqlite` or `rest`
//! - `PROFILESYNC_SQLITE_PATH`: SQLite database file
//! - `PROFILESYNC_POOL_SIZE`: SQLite connection pool size
//! - `PROFILESYNC_PROFILE_TABLE`: Table holding profile rows
//! - `PROFILESYNC_ADMIN_SEED_ENABLED`: Whether to seed the admin account
//! - `PROFILESYNC_ADMIN_EMAIL` / `PROFILESYNC_ADMIN_PASSWORD` /
//!   `PROFILESYNC_ADMIN_USERNAME`: Admin credentials
//! - `PROFILESYNC_LOG_LEVEL`: Default log filter
//! - `PROFILESYNC_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.toml` or `./config.json` (current working directory)
//! 2. `./profilesync.toml` or `./profilesync.json` (current working directory)
//! 3. `../config.toml` or `../config.json` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use profilesync_domain::{Config, ProfileSyncError, Result};

/// Load configuration with automatic fallback strategy
///
/// A probed config file (or defaults when none exists) overlaid with
/// environment overrides.
///
/// # Errors
/// Returns `ProfileSyncError::Config` if:
/// - The probed file cannot be read or parsed
/// - An environment override has an invalid value
/// - The resulting configuration fails validation
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
    }

    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let config = apply_env_overrides(base)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults and environment variables only
///
/// # Errors
/// Returns `ProfileSyncError::Config` for invalid values or a configuration
/// that fails validation.
pub fn load_from_env() -> Result<Config> {
    let config = apply_env_overrides(Config::default())?;
    config.validate()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension). Missing
/// fields take their defaults.
///
/// # Errors
/// Returns `ProfileSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ProfileSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ProfileSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ProfileSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ProfileSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ProfileSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ProfileSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.toml", "config.json", "profilesync.toml", "profilesync.json"];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
        candidates.push(cwd.join("../config.toml"));
        candidates.push(cwd.join("../config.json"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Overlay `PROFILESYNC_*` variables onto `config`
fn apply_env_overrides(mut config: Config) -> Result<Config> {
    if let Some(backend) = env_parsed("PROFILESYNC_IDENTITY_BACKEND")? {
        config.identity.backend = backend;
    }
    if let Some(url) = env_opt("PROFILESYNC_API_URL") {
        config.identity.api_url = Some(url);
    }
    if let Some(key) = env_opt("PROFILESYNC_ANON_KEY") {
        config.identity.anon_key = Some(key);
    }
    if let Some(timeout) = env_parsed("PROFILESYNC_REQUEST_TIMEOUT_SECS")? {
        config.identity.request_timeout_secs = timeout;
    }

    if let Some(backend) = env_parsed("PROFILESYNC_STORE_BACKEND")? {
        config.store.backend = backend;
    }
    if let Some(path) = env_opt("PROFILESYNC_SQLITE_PATH") {
        config.store.sqlite_path = path;
    }
    if let Some(size) = env_parsed("PROFILESYNC_POOL_SIZE")? {
        config.store.pool_size = size;
    }
    if let Some(table) = env_opt("PROFILESYNC_PROFILE_TABLE") {
        config.store.table = table;
    }

    config.admin_seed.enabled =
        env_bool("PROFILESYNC_ADMIN_SEED_ENABLED", config.admin_seed.enabled);
    if let Some(email) = env_opt("PROFILESYNC_ADMIN_EMAIL") {
        config.admin_seed.email = email;
    }
    if let Some(password) = env_opt("PROFILESYNC_ADMIN_PASSWORD") {
        config.admin_seed.password = password;
    }
    if let Some(username) = env_opt("PROFILESYNC_ADMIN_USERNAME") {
        config.admin_seed.username = username;
    }

    if let Some(level) = env_opt("PROFILESYNC_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("PROFILESYNC_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Get an optional, non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `ProfileSyncError::Config` if the variable is set but invalid.
fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ProfileSyncError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
