//! Integration tests for AppContext lifecycle
//!
//! Tests verify that AppContext wires the configured backends, starts the
//! reconciler, seeds the admin account and shuts down cleanly.

use std::time::Duration;

use profilesync_domain::{
    AuthSnapshot, Config, IdentityBackend, ProfileSyncError, ReconcilePhase, StoreBackend,
};
use profilesync_lib::AppContext;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for(ctx: &AppContext, predicate: impl FnMut(&AuthSnapshot) -> bool) -> AuthSnapshot {
    let mut receiver = ctx.reconciler.subscribe();
    let snapshot = tokio::time::timeout(WAIT, receiver.wait_for(predicate))
        .await
        .expect("state should settle in time")
        .expect("state channel should stay open");
    (*snapshot).clone()
}

#[tokio::test]
async fn default_config_seeds_admin_session() {
    let ctx = AppContext::new(Config::default()).unwrap();
    assert!(ctx.db().is_none());

    ctx.start().unwrap();
    let snapshot = wait_for(&ctx, |s| s.ready && s.is_admin()).await;

    let profile = snapshot.profile.unwrap();
    assert_eq!(profile.email, "admin@test.com");
    assert_eq!(profile.username, "admin");

    ctx.shutdown().await.unwrap();
}

#[tokio::test]
async fn seeding_disabled_starts_signed_out() {
    let mut config = Config::default();
    config.admin_seed.enabled = false;
    let ctx = AppContext::new(config).unwrap();

    ctx.start().unwrap();
    let snapshot = wait_for(&ctx, |s| s.ready).await;
    assert_eq!(snapshot.phase, ReconcilePhase::SignedOut);

    ctx.shutdown().await.unwrap();
}

#[tokio::test]
async fn sqlite_backend_persists_seeded_profile() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.store.backend = StoreBackend::Sqlite;
    config.store.sqlite_path = temp_dir.path().join("profiles.db").to_string_lossy().into_owned();

    let ctx = AppContext::new(config).unwrap();
    ctx.start().unwrap();
    let snapshot = wait_for(&ctx, |s| s.ready && s.profile.is_some()).await;
    let profile = snapshot.profile.unwrap();
    ctx.shutdown().await.unwrap();

    let stored = ctx.store.get_by_id(&profile.id).await.unwrap();
    assert_eq!(stored, profile);
    assert_eq!(stored.email, "admin@test.com");
    ctx.db().unwrap().health_check().unwrap();
}

#[tokio::test]
async fn double_start_and_idle_shutdown_are_lifecycle_errors() {
    let ctx = AppContext::new(Config::default()).unwrap();

    assert!(matches!(ctx.shutdown().await, Err(ProfileSyncError::Lifecycle(_))));

    ctx.start().unwrap();
    assert!(matches!(ctx.start(), Err(ProfileSyncError::Lifecycle(_))));
    ctx.shutdown().await.unwrap();
}

#[test]
fn http_backend_without_api_settings_is_rejected() {
    let mut config = Config::default();
    config.identity.backend = IdentityBackend::Http;

    assert!(matches!(AppContext::new(config), Err(ProfileSyncError::Config(_))));
}

#[test]
fn http_backends_are_built_without_network_access() {
    let mut config = Config::default();
    config.identity.backend = IdentityBackend::Http;
    config.identity.api_url = Some("https://project.example.test".into());
    config.identity.anon_key = Some("anon".into());
    config.store.backend = StoreBackend::Rest;

    let ctx = AppContext::new(config).unwrap();
    assert!(ctx.db().is_none());
    assert!(!ctx.reconciler.is_running());
}
