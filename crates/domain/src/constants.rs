//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Profile derivation
pub const FALLBACK_USERNAME: &str = "user";

// Bootstrap seeding defaults
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@test.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

// Profile store defaults
pub const DEFAULT_PROFILE_TABLE: &str = "users";
pub const DEFAULT_SQLITE_PATH: &str = "profilesync.db";
pub const DEFAULT_POOL_SIZE: u32 = 4;

// Identity service defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Session event fan-out
pub const SESSION_EVENT_CAPACITY: usize = 64;

// Lifecycle
pub const SHUTDOWN_JOIN_TIMEOUT_SECS: u64 = 5;
