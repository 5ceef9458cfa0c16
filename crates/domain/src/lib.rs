//! # ProfileSync Domain
//!
//! Business domain types and models for ProfileSync.
//!
//! This crate contains:
//! - Identity types observed from the provider (Principal, Session, events)
//! - The application-owned Profile record and its Role
//! - The observable reconciliation state (`AuthSnapshot`)
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other ProfileSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
