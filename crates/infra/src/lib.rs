//! # ProfileSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Identity service adapters (in-memory, GoTrue-compatible HTTP)
//! - Profile store adapters (in-memory, SQLite, PostgREST-compatible HTTP)
//! - Configuration loading and tracing initialisation
//! - Conversions from driver errors into domain errors
//!
//! ## Architecture
//! - Implements traits defined in `profilesync-core`
//! - Contains all "impure" code (I/O, network, disk)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod memory;
pub mod observability;

// Re-export commonly used items
pub use api::{BackendEndpoint, HttpIdentityService, RestProfileStore};
pub use database::{DbManager, SqliteProfileStore};
pub use errors::InfraError;
pub use http::HttpClient;
pub use memory::{InMemoryIdentityService, InMemoryProfileStore};
