//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::exposure::{CallbackRegistry, DumpRenderer, ExposureService, RegistryHandle};
use crate::store::{ContentStore, MemoryContentStore, PgContentStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Content store engine, kept for health checks.
    store: Arc<dyn ContentStore>,

    /// Exposure pipeline over the store.
    exposure: ExposureService,

    /// Transformer registry, shared with the exposure service.
    registry: Arc<RegistryHandle>,

    /// HTML dump renderer; None when the dump is disabled.
    dump: Option<DumpRenderer>,

    /// Bearer token of privileged clients.
    admin_token: Option<String>,
}

impl AppState {
    /// Initialize state from configuration.
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set (running migrations),
    /// otherwise an in-memory store seeded from `CONTENT_FIXTURE` or holding
    /// just the root resource.
    pub async fn new(config: &Config, registry: CallbackRegistry) -> Result<Self> {
        if let Some(database_url) = &config.database_url {
            let pool = db::create_pool(database_url, config)
                .await
                .context("failed to create database pool")?;

            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;

            info!("PostgreSQL content store ready");
            return Self::with_store(Arc::new(PgContentStore::new(pool)), registry, config);
        }

        let store = match &config.content_fixture {
            Some(path) => MemoryContentStore::load_fixture(path)
                .await
                .context("failed to load content fixture")?,
            None => {
                warn!("no DATABASE_URL or CONTENT_FIXTURE set; serving an empty content tree");
                MemoryContentStore::with_root()
            }
        };

        Self::with_store(Arc::new(store), registry, config)
    }

    /// Build state around an existing store.
    pub fn with_store<S>(store: Arc<S>, registry: CallbackRegistry, config: &Config) -> Result<Self>
    where
        S: ContentStore + 'static,
    {
        let dump = if config.debug_dump {
            Some(DumpRenderer::new().context("failed to initialize dump renderer")?)
        } else {
            None
        };
        Ok(Self::assemble(store, registry, config, dump))
    }

    /// Build state around an existing store with a specific dump renderer,
    /// regardless of `config.debug_dump`.
    pub fn with_dump<S>(
        store: Arc<S>,
        registry: CallbackRegistry,
        config: &Config,
        dump: DumpRenderer,
    ) -> Self
    where
        S: ContentStore + 'static,
    {
        Self::assemble(store, registry, config, Some(dump))
    }

    fn assemble<S>(
        store: Arc<S>,
        registry: CallbackRegistry,
        config: &Config,
        dump: Option<DumpRenderer>,
    ) -> Self
    where
        S: ContentStore + 'static,
    {
        info!(
            engine = store.engine(),
            transformers = registry.len(),
            "initializing exposure service"
        );

        let registry = Arc::new(RegistryHandle::new(registry));
        let exposure =
            ExposureService::from_store(Arc::clone(&store), Arc::clone(&registry), &config.site_url);

        if config.admin_token.is_none() {
            info!("ADMIN_TOKEN not set; admin routes are disabled");
        }

        Self {
            inner: Arc::new(AppStateInner {
                store,
                exposure,
                registry,
                dump,
                admin_token: config.admin_token.clone(),
            }),
        }
    }

    /// Get the exposure service.
    pub fn exposure(&self) -> &ExposureService {
        &self.inner.exposure
    }

    /// Get the content store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.inner.store
    }

    /// Get the transformer registry handle.
    pub fn registry(&self) -> &Arc<RegistryHandle> {
        &self.inner.registry
    }

    /// Get the dump renderer, if enabled.
    pub fn dump(&self) -> Option<&DumpRenderer> {
        self.inner.dump.as_ref()
    }

    /// Get the admin token, if configured.
    pub fn admin_token(&self) -> Option<&str> {
        self.inner.admin_token.as_deref()
    }

    /// Check if the content store is healthy.
    pub async fn store_healthy(&self) -> bool {
        self.inner.store.check_health().await
    }
}
