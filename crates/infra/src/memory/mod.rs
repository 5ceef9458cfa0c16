//! In-process adapters for development and tests

pub mod identity;
pub mod profile_store;

pub use identity::InMemoryIdentityService;
pub use profile_store::InMemoryProfileStore;
