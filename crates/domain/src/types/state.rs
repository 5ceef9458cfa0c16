//! Observable reconciliation state

use serde::{Deserialize, Serialize};

use super::session::Principal;
use super::user::Profile;
use crate::impl_domain_enum_conversions;

/// Phase of the session reconciliation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    /// No session observed yet
    #[default]
    Idle,
    /// Profile lookup in flight
    Resolving,
    /// Profile resolution finished (profile may still be empty on error)
    Resolved,
    /// Session absent or cleared
    SignedOut,
}

impl_domain_enum_conversions!(ReconcilePhase {
    Idle => "idle",
    Resolving => "resolving",
    Resolved => "resolved",
    SignedOut => "signed_out",
});

/// Point-in-time view of the reconciler's state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    /// Safe to read; false while a cycle is in flight
    pub ready: bool,
    pub phase: ReconcilePhase,
    /// Latest observed session epoch
    pub epoch: u64,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    pub fn is_loading(&self) -> bool {
        !self.ready
    }
}
