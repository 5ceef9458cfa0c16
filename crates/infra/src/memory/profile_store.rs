//! In-process profile store

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use profilesync_core::ProfileStore;
use profilesync_domain::{Profile, StoreError};

/// Profile store backed by a concurrent map keyed by profile id
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, Profile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_by_id(&self, id: &str) -> Result<Profile, StoreError> {
        self.profiles
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, profile: &Profile) -> Result<(), StoreError> {
        match self.profiles.entry(profile.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(profile.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use profilesync_domain::{Principal, Role};

    use super::*;

    fn profile(id: &str) -> Profile {
        let principal = Principal::new(id, Some(format!("{id}@example.com")));
        Profile::candidate(&principal, None, Role::User, Utc::now())
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = InMemoryProfileStore::new();
        assert_eq!(store.get_by_id("u1").await, Err(StoreError::NotFound("u1".into())));
    }

    #[tokio::test]
    async fn second_insert_for_same_id_is_rejected() {
        let store = InMemoryProfileStore::new();
        let first = profile("u1");
        store.insert(&first).await.unwrap();

        let mut second = profile("u1");
        second.role = Role::Admin;
        assert_eq!(store.insert(&second).await, Err(StoreError::AlreadyExists("u1".into())));

        assert_eq!(store.get_by_id("u1").await.unwrap(), first);
        assert_eq!(store.len(), 1);
    }
}
