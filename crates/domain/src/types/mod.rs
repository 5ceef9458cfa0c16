//! Domain types and models
//!
//! Identity-side types are observed from the provider, the profile types are
//! owned by the application, and the state types describe what the
//! reconciler exposes upward.

pub mod session;
pub mod state;
pub mod user;

pub use session::{Principal, Session, SessionEvent, SessionEventKind};
pub use state::{AuthSnapshot, ReconcilePhase};
pub use user::{derive_username, Profile, Role};
