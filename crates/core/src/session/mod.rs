//! Session-to-profile reconciliation

pub mod reconciler;

pub use reconciler::SessionReconciler;
