//! Conversions from external infrastructure errors into domain errors.

use profilesync_domain::{IdentityError, ProfileSyncError, StoreError};
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ProfileSyncError);

impl From<InfraError> for ProfileSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ProfileSyncError> for InfraError {
    fn from(value: ProfileSyncError) -> Self {
        Self(value)
    }
}

impl From<StoreError> for InfraError {
    fn from(value: StoreError) -> Self {
        Self(ProfileSyncError::Store(value))
    }
}

impl From<IdentityError> for InfraError {
    fn from(value: IdentityError) -> Self {
        Self(ProfileSyncError::Identity(value))
    }
}

/// Narrow to the store taxonomy; anything that is not already a store error
/// becomes `StoreError::Backend`.
impl From<InfraError> for StoreError {
    fn from(value: InfraError) -> Self {
        match value.0 {
            ProfileSyncError::Store(err) => err,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Narrow to the identity taxonomy. Failures with no HTTP status attached are
/// reported as `Provider { status: 0 }`.
impl From<InfraError> for IdentityError {
    fn from(value: InfraError) -> Self {
        match value.0 {
            ProfileSyncError::Identity(err) => err,
            ProfileSyncError::Config(message) => Self::Config(message),
            other => Self::Provider { status: 0, message: other.to_string() },
        }
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoProfileSyncError {
    fn into_profilesync(self) -> ProfileSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → StoreError */
/* -------------------------------------------------------------------------- */

// SQLITE_CONSTRAINT_PRIMARYKEY and SQLITE_CONSTRAINT_UNIQUE
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

impl IntoProfileSyncError for SqlError {
    fn into_profilesync(self) -> ProfileSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let store = match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => StoreError::Backend("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        StoreError::Backend("database is locked".into())
                    }
                    (
                        ErrorCode::ConstraintViolation,
                        SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE,
                    ) => StoreError::AlreadyExists(message),
                    _ => StoreError::Backend(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => StoreError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                StoreError::Backend(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                StoreError::Backend(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => StoreError::Backend(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => StoreError::Backend(other.to_string()),
        };
        ProfileSyncError::Store(store)
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_profilesync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → StoreError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        Self(ProfileSyncError::Store(StoreError::Backend(format!(
            "connection pool error: {value}"
        ))))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → IdentityError */
/* -------------------------------------------------------------------------- */

impl IntoProfileSyncError for HttpError {
    fn into_profilesync(self) -> ProfileSyncError {
        if self.is_timeout() {
            return IdentityError::Network("HTTP request timed out".into()).into();
        }

        if self.is_connect() {
            return IdentityError::Network("HTTP connection failure".into()).into();
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 => IdentityError::NotAuthenticated,
                429 | 500..=599 => IdentityError::Network(message),
                _ => IdentityError::Provider { status: code, message },
            }
            .into();
        }

        if self.is_decode() {
            return ProfileSyncError::Internal(format!("unexpected response body: {self}"));
        }

        IdentityError::Network(self.to_string()).into()
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_profilesync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        Self(ProfileSyncError::Internal(format!("invalid JSON payload: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
