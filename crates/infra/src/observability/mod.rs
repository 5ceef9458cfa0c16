//! Observability infrastructure
//!
//! Structured logging through `tracing`. Every component logs with key/value
//! fields (`principal_id`, `epoch`, `error`); this module only decides where
//! those events go and in which format.

pub mod logging;

pub use logging::{build_filter, init_tracing};
