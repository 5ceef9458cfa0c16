//! Application context - dependency injection container

use std::sync::Arc;

use profilesync_core::{BootstrapSeeder, IdentityService, ProfileStore, SessionReconciler};
use profilesync_domain::{Config, IdentityBackend, Result, StoreBackend};
use profilesync_infra::api::{AccessTokenProvider, BackendEndpoint};
use profilesync_infra::{
    DbManager, HttpIdentityService, InMemoryIdentityService, InMemoryProfileStore,
    RestProfileStore, SqliteProfileStore,
};
use tracing::info;

/// Type alias for identity service port trait object
type DynIdentityService = dyn IdentityService + 'static;

/// Type alias for profile store port trait object
type DynProfileStore = dyn ProfileStore + 'static;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub identity: Arc<DynIdentityService>,
    pub store: Arc<DynProfileStore>,
    pub reconciler: Arc<SessionReconciler>,
    db: Option<Arc<DbManager>>,
}

struct IdentityParts {
    service: Arc<DynIdentityService>,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl AppContext {
    /// Build every adapter named by `config`.
    ///
    /// Nothing runs until [`AppContext::start`].
    ///
    /// # Errors
    /// Invalid configuration, or a store that cannot be opened.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let identity = build_identity(&config)?;
        let (store, db) = build_store(&config, identity.tokens.clone())?;

        let mut reconciler =
            SessionReconciler::new(Arc::clone(&identity.service), Arc::clone(&store));
        let seeder = BootstrapSeeder::from_config(
            Arc::clone(&identity.service),
            Arc::clone(&store),
            &config.admin_seed,
        );
        if let Some(seeder) = seeder {
            reconciler = reconciler.with_seeder(seeder);
        }

        info!(
            identity_backend = %config.identity.backend,
            store_backend = %config.store.backend,
            admin_seed = config.admin_seed.enabled,
            "application context created"
        );

        Ok(Self { config, identity: identity.service, store, reconciler: Arc::new(reconciler), db })
    }

    /// Start the session reconciler (and the admin seeder, once).
    ///
    /// # Errors
    /// `ProfileSyncError::Lifecycle` if already started.
    pub fn start(&self) -> Result<()> {
        self.reconciler.start()
    }

    /// # Errors
    /// `ProfileSyncError::Lifecycle` if not running or the listener does not
    /// stop in time.
    pub async fn shutdown(&self) -> Result<()> {
        self.reconciler.shutdown().await?;
        info!("application context shut down");
        Ok(())
    }

    /// SQLite pool, when the sqlite store backend is configured
    pub fn db(&self) -> Option<&Arc<DbManager>> {
        self.db.as_ref()
    }
}

fn build_identity(config: &Config) -> Result<IdentityParts> {
    Ok(match config.identity.backend {
        IdentityBackend::Memory => {
            IdentityParts { service: Arc::new(InMemoryIdentityService::new()), tokens: None }
        }
        IdentityBackend::Http => {
            let service = Arc::new(HttpIdentityService::from_config(&config.identity)?);
            let tokens: Arc<dyn AccessTokenProvider> = service.clone();
            IdentityParts { service, tokens: Some(tokens) }
        }
    })
}

fn build_store(
    config: &Config,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
) -> Result<(Arc<DynProfileStore>, Option<Arc<DbManager>>)> {
    let settings = &config.store;
    let mut db = None;

    let store: Arc<DynProfileStore> = match settings.backend {
        StoreBackend::Memory => Arc::new(InMemoryProfileStore::new()),
        StoreBackend::Sqlite => {
            let manager = Arc::new(DbManager::new(&settings.sqlite_path, settings.pool_size)?);
            let profiles = SqliteProfileStore::new(Arc::clone(&manager), &settings.table)?;
            db = Some(manager);
            Arc::new(profiles)
        }
        StoreBackend::Rest => {
            let endpoint = BackendEndpoint::from_config(&config.identity)?;
            let mut profiles = RestProfileStore::from_endpoint(endpoint, settings.table.clone())?;
            if let Some(tokens) = tokens {
                profiles = profiles.with_token_provider(tokens);
            }
            Arc::new(profiles)
        }
    };

    Ok((store, db))
}
