//! Shared test helpers for `profilesync-core` integration tests.
//!
//! Scripted identity and store fakes. Gates on store lookups let tests force
//! interleavings between reconciliation cycles without sleeping.

#![allow(dead_code)]

pub mod identity;
pub mod store;

use profilesync_domain::{Principal, Session, SessionEvent};

pub use identity::ScriptedIdentity;
pub use store::{GatedStore, LookupGate};

pub fn principal(id: &str, email: &str) -> Principal {
    Principal::new(id, Some(email.to_string()))
}

pub fn signed_in(principal: &Principal) -> SessionEvent {
    SessionEvent::signed_in(Session::new(format!("token-{}", principal.id), principal.clone()))
}
