//! # ProfileSync Application
//!
//! Wires the configured adapters into a running session reconciler.

pub mod context;

pub use context::AppContext;
