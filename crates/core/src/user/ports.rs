//! Port interfaces for user profile management
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations for user profile operations.

use async_trait::async_trait;
use profilesync_domain::{Profile, StoreError};

/// Trait for profile persistence and retrieval, keyed by principal id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by id.
    ///
    /// # Errors
    /// `StoreError::NotFound` when no record exists; `StoreError::Backend`
    /// for every other failure.
    async fn get_by_id(&self, id: &str) -> Result<Profile, StoreError>;

    /// Insert a new profile.
    ///
    /// # Errors
    /// `StoreError::AlreadyExists` when a record with the same id exists.
    async fn insert(&self, profile: &Profile) -> Result<(), StoreError>;
}
