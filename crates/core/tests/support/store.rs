//! Profile store fake with failure injection and lookup gates

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use profilesync_core::ProfileStore;
use profilesync_domain::{Profile, StoreError};
use tokio::sync::{Barrier, Notify};

/// Holds one lookup for an id until released
#[derive(Clone, Default)]
pub struct LookupGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl LookupGate {
    /// Wait until a lookup is parked on this gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
pub struct GatedStore {
    rows: Mutex<HashMap<String, Profile>>,
    gates: Mutex<HashMap<String, LookupGate>>,
    rendezvous: Mutex<HashMap<String, (Arc<Barrier>, usize)>>,
    lookup_failure: Mutex<Option<StoreError>>,
    reread_failure: Mutex<Option<StoreError>>,
    insert_failure: Mutex<Option<StoreError>>,
    lookups: AtomicUsize,
    inserts: AtomicUsize,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, profile: Profile) {
        self.rows.lock().insert(profile.id.clone(), profile);
    }

    /// Park the next lookup for `id` until the returned gate is released
    pub fn gate(&self, id: &str) -> LookupGate {
        let gate = LookupGate::default();
        self.gates.lock().insert(id.to_string(), gate.clone());
        gate
    }

    /// Make the next `parties` lookups for `id` read the row, then wait for
    /// each other before answering
    pub fn rendezvous(&self, id: &str, parties: usize) {
        self.rendezvous.lock().insert(id.to_string(), (Arc::new(Barrier::new(parties)), parties));
    }

    /// Every lookup fails with `err`
    pub fn fail_lookups_with(&self, err: StoreError) {
        *self.lookup_failure.lock() = Some(err);
    }

    /// Lookups after the first one fail with `err`
    pub fn fail_rereads_with(&self, err: StoreError) {
        *self.reread_failure.lock() = Some(err);
    }

    pub fn fail_inserts_with(&self, err: StoreError) {
        *self.insert_failure.lock() = Some(err);
    }

    pub fn get(&self, id: &str) -> Option<Profile> {
        self.rows.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for GatedStore {
    async fn get_by_id(&self, id: &str) -> Result<Profile, StoreError> {
        let previous_lookups = self.lookups.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().remove(id);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let row = self.rows.lock().get(id).cloned();

        let barrier = {
            let mut rendezvous = self.rendezvous.lock();
            let barrier = rendezvous.get_mut(id).map(|(barrier, remaining)| {
                *remaining -= 1;
                (Arc::clone(barrier), *remaining == 0)
            });
            if let Some((_, true)) = barrier {
                rendezvous.remove(id);
            }
            barrier.map(|(barrier, _)| barrier)
        };
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if let Some(err) = self.lookup_failure.lock().clone() {
            return Err(err);
        }
        if previous_lookups > 0 {
            if let Some(err) = self.reread_failure.lock().clone() {
                return Err(err);
            }
        }
        row.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, profile: &Profile) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.insert_failure.lock().clone() {
            return Err(err);
        }
        let mut rows = self.rows.lock();
        if rows.contains_key(&profile.id) {
            return Err(StoreError::AlreadyExists(profile.id.clone()));
        }
        rows.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}
