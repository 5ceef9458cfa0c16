//! Reconciler and seeder wired to the in-process adapters.

mod support;

use std::sync::Arc;

use profilesync_core::{AdminCredentials, BootstrapSeeder, IdentityService, SessionReconciler};
use profilesync_domain::{IdentityError, ReconcilePhase, Role};
use profilesync_infra::memory::{InMemoryIdentityService, InMemoryProfileStore};
use support::wait_for;

fn stack() -> (Arc<InMemoryIdentityService>, Arc<InMemoryProfileStore>, SessionReconciler) {
    let identity = Arc::new(InMemoryIdentityService::new());
    let store = Arc::new(InMemoryProfileStore::new());
    let reconciler = SessionReconciler::new(identity.clone(), store.clone());
    (identity, store, reconciler)
}

#[tokio::test]
async fn seeded_admin_is_signed_in_with_admin_profile() {
    let identity = Arc::new(InMemoryIdentityService::new());
    let store = Arc::new(InMemoryProfileStore::new());
    let seeder = BootstrapSeeder::new(
        identity.clone(),
        store.clone(),
        AdminCredentials::new("admin@test.com", "admin123", "admin"),
    );
    let reconciler = SessionReconciler::new(identity.clone(), store.clone()).with_seeder(seeder);

    reconciler.start().unwrap();
    let snapshot = wait_for(&reconciler, |s| s.ready && s.is_admin()).await;

    let profile = snapshot.profile.unwrap();
    assert_eq!(profile.username, "admin");
    assert_eq!(profile.email, "admin@test.com");
    assert_eq!(store.len(), 1);
    assert_eq!(identity.account_count(), 1);

    reconciler.shutdown().await.unwrap();
}

#[tokio::test]
async fn sign_up_stores_chosen_username() {
    let (_identity, store, reconciler) = stack();
    reconciler.start().unwrap();
    wait_for(&reconciler, |s| s.phase == ReconcilePhase::SignedOut).await;

    let session = reconciler.sign_up("Bob@Example.com", "hunter22", "bobby").await.unwrap();
    let snapshot = wait_for(&reconciler, |s| s.ready && s.profile.is_some()).await;

    assert_eq!(snapshot.principal.map(|p| p.id), Some(session.principal.id));
    assert_eq!(store.len(), 1);
    let profile = snapshot.profile.unwrap();
    assert_eq!(profile.username, "bobby");
    assert_eq!(profile.role, Role::User);
    assert_eq!(profile.email, "bob@example.com");

    reconciler.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplicate_sign_up_is_reported_and_state_unchanged() {
    let (identity, _store, reconciler) = stack();
    identity.sign_up("carol@example.com", "secret12").await.unwrap();
    reconciler.start().unwrap();
    wait_for(&reconciler, |s| s.ready && s.profile.is_some()).await;

    assert_eq!(
        reconciler.sign_up("carol@example.com", "secret12", "carol2").await,
        Err(IdentityError::AlreadyRegistered)
    );
    assert_eq!(reconciler.current_profile().map(|p| p.username), Some("carol".into()));

    reconciler.shutdown().await.unwrap();
}

#[tokio::test]
async fn token_refresh_keeps_profile_and_round_trip_sign_in_works() {
    let (identity, store, reconciler) = stack();
    reconciler.start().unwrap();

    reconciler.sign_up("dave@example.com", "hunter22", "dave").await.unwrap();
    let before = wait_for(&reconciler, |s| s.ready && s.profile.is_some()).await;

    identity.refresh_session().unwrap();
    let after = wait_for(&reconciler, |s| s.epoch > before.epoch && s.ready).await;
    assert_eq!(after.profile, before.profile);

    reconciler.sign_out().await.unwrap();
    assert!(!reconciler.is_authenticated());

    reconciler.sign_in("dave@example.com", "hunter22").await.unwrap();
    let again = wait_for(&reconciler, |s| s.ready && s.profile.is_some()).await;
    assert_eq!(again.profile, before.profile);
    assert_eq!(store.len(), 1);

    reconciler.shutdown().await.unwrap();
    assert_eq!(identity.receiver_count(), 0);
}
