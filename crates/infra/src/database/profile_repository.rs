//! Profile store persisted in a local SQLite database

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use profilesync_core::ProfileStore;
use profilesync_domain::{Profile, ProfileSyncError, Result as DomainResult, Role, StoreError};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tokio::task;
use tracing::debug;

use super::manager::{map_sql_error, validate_table_name, DbManager};

/// SQLite-backed implementation of `ProfileStore`
pub struct SqliteProfileStore {
    db: Arc<DbManager>,
    table: Arc<str>,
}

impl SqliteProfileStore {
    /// Create the store and make sure its table exists.
    pub fn new(db: Arc<DbManager>, table: &str) -> DomainResult<Self> {
        validate_table_name(table)?;
        db.run_migrations(table)?;
        Ok(Self { db, table: Arc::from(table) })
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_by_id(&self, id: &str) -> Result<Profile, StoreError> {
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Profile, StoreError> {
            let conn = db.get_connection().map_err(into_store_error)?;
            match select_profile(&conn, &table, &id) {
                Ok(profile) => Ok(profile),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id)),
                Err(err) => Err(into_store_error(map_sql_error(err))),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert(&self, profile: &Profile) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let profile = profile.clone();

        task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = db.get_connection().map_err(into_store_error)?;
            match insert_profile(&conn, &table, &profile) {
                Ok(()) => {
                    debug!(profile_id = %profile.id, "profile row inserted");
                    Ok(())
                }
                Err(err) => Err(match into_store_error(map_sql_error(err)) {
                    // The constraint message names the column, not the row.
                    StoreError::AlreadyExists(_) => StoreError::AlreadyExists(profile.id),
                    other => other,
                }),
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

fn select_profile(conn: &Connection, table: &str, id: &str) -> rusqlite::Result<Profile> {
    conn.query_row(
        &format!("SELECT id, username, email, role, created_at FROM {table} WHERE id = ?1"),
        params![id],
        map_profile_row,
    )
}

fn insert_profile(conn: &Connection, table: &str, profile: &Profile) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, username, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![
            profile.id,
            profile.username,
            profile.email,
            profile.role.as_str(),
            profile.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ],
    )?;
    Ok(())
}

fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let role: String = row.get(3)?;
    let role = role.parse::<Role>().map_err(|err| conversion_error(3, err))?;

    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|err| conversion_error(4, err.to_string()))?
        .with_timezone(&Utc);

    Ok(Profile { id: row.get(0)?, username: row.get(1)?, email: row.get(2)?, role, created_at })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn into_store_error(err: ProfileSyncError) -> StoreError {
    match err {
        ProfileSyncError::Store(store) => store,
        other => StoreError::Backend(other.to_string()),
    }
}

fn map_join_error(err: task::JoinError) -> StoreError {
    if err.is_cancelled() {
        StoreError::Backend("blocking database task cancelled".into())
    } else {
        StoreError::Backend(format!("blocking database task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use profilesync_domain::Principal;
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> SqliteProfileStore {
        let db = Arc::new(DbManager::new(dir.path().join("profiles.db"), 2).unwrap());
        SqliteProfileStore::new(db, "users").unwrap()
    }

    fn admin() -> Profile {
        let principal = Principal::new("u-admin", Some("admin@test.com".into()));
        Profile::candidate(
            &principal,
            Some("admin"),
            Role::Admin,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_then_lookup_preserves_every_field() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.insert(&admin()).await.unwrap();
        assert_eq!(store.get_by_id("u-admin").await.unwrap(), admin());
    }

    #[tokio::test]
    async fn missing_row_is_not_found_with_the_requested_id() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            store(&dir).get_by_id("nobody").await,
            Err(StoreError::NotFound("nobody".into()))
        );
    }

    #[tokio::test]
    async fn duplicate_id_is_already_exists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.insert(&admin()).await.unwrap();

        let mut duplicate = admin();
        duplicate.role = Role::User;
        assert_eq!(store.insert(&duplicate).await, Err(StoreError::AlreadyExists("u-admin".into())));
        assert_eq!(store.get_by_id("u-admin").await.unwrap().role, Role::Admin);
    }

    #[test]
    fn unsafe_table_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("profiles.db"), 1).unwrap());
        assert!(matches!(
            SqliteProfileStore::new(db, "users--"),
            Err(ProfileSyncError::Config(_))
        ));
    }
}
