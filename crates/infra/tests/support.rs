#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use profilesync_core::SessionReconciler;
use profilesync_domain::{AuthSnapshot, Principal, Profile, Role};
use profilesync_infra::database::DbManager;
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("profiles.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn profile(id: &str, email: &str, role: Role) -> Profile {
    let principal = Principal::new(id, Some(email.to_string()));
    Profile::candidate(&principal, None, role, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}

const WAIT: Duration = Duration::from_secs(5);

/// Wait (bounded) until the reconciler publishes a snapshot matching
/// `predicate`.
pub async fn wait_for(
    reconciler: &SessionReconciler,
    predicate: impl FnMut(&AuthSnapshot) -> bool,
) -> AuthSnapshot {
    let mut receiver = reconciler.subscribe();
    let snapshot = tokio::time::timeout(WAIT, receiver.wait_for(predicate))
        .await
        .expect("reconciler should settle in time")
        .expect("state channel should stay open");
    (*snapshot).clone()
}
