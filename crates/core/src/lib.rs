//! # ProfileSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the identity service and profile store (traits)
//! - Profile provisioning shared by every creation path
//! - The session reconciler state machine
//! - The bootstrap seeder for the administrative account
//!
//! ## Architecture Principles
//! - Only depends on `profilesync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod bootstrap;
pub mod identity;
pub mod session;
pub mod user;

// Re-export specific items to avoid ambiguity
pub use bootstrap::{AdminCredentials, BootstrapSeeder, SeedOutcome};
pub use identity::ports::{IdentityService, SessionSubscription};
pub use session::SessionReconciler;
pub use user::ports::ProfileStore;
pub use user::provisioner::{EnsuredProfile, ProfileOrigin, ProfileProvisioner};
