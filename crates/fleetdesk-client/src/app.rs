//! Application wiring
//!
//! `App` is the single owner of everything a console session needs: the
//! state store, the API client, the query cache and the session, tenant and
//! settings contexts. Commands borrow what they need from it.

use fleetdesk_api::{ApiClient, ApiError, Credentials, ResourceApi};
use fleetdesk_core::{Entity, Resource, User};
use fleetdesk_observability::Metrics;
use fleetdesk_query::{Notifier, QueryCache, ResourceQuery, TracingNotifier};
use fleetdesk_session::{SessionContext, SettingsContext, TenantContext};
use fleetdesk_storage::{FileStateStore, MemoryStateStore, StateStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ClientConfig, ConfigError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create API client: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to register metrics: {0}")]
    Metrics(String),
}

pub struct App {
    config: ClientConfig,
    store: Arc<dyn StateStore>,
    persistent: bool,
    resources: ResourceApi,
    cache: QueryCache,
    session: SessionContext,
    settings: SettingsContext,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
}

impl App {
    /// Build and initialize the app, logging notifications
    pub async fn start(config: ClientConfig) -> Result<Self, AppError> {
        Self::start_with_notifier(config, Arc::new(TracingNotifier)).await
    }

    /// Build the app and restore the persisted session and settings.
    ///
    /// Falls back to in-memory state if the state file can't be opened.
    pub async fn start_with_notifier(
        config: ClientConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let metrics = Metrics::new().map_err(|e| AppError::Metrics(e.to_string()))?;
        let (store, persistent) = open_store(&config).await;

        let api = Arc::new(
            ApiClient::new(&config.api.base_url, &config.api.http_config())?
                .with_metrics(metrics.clone()),
        );
        let cache = QueryCache::with_metrics(config.cache.cache_config(), metrics.clone());

        let session = SessionContext::new(Arc::clone(&api), Arc::clone(&store));
        let settings = SettingsContext::load(Arc::clone(&store)).await;
        let restored = session.initialize().await;
        info!(
            "Fleetdesk client started against {} (signed in: {})",
            api.base_url(),
            restored.is_authenticated()
        );

        Ok(Self {
            config,
            store,
            persistent,
            resources: ResourceApi::new(api),
            cache,
            session,
            settings,
            notifier,
            metrics,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether state survives a restart
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn settings(&self) -> &SettingsContext {
        &self.settings
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn tenant(&self) -> TenantContext {
        TenantContext::from_session(&self.session.current())
    }

    /// Query handle for one resource family, sharing the app's cache
    pub fn query<T: Entity>(&self, resource: Resource) -> ResourceQuery<T> {
        ResourceQuery::new(
            resource,
            self.resources.clone(),
            self.cache.clone(),
            Arc::clone(&self.notifier),
        )
        .with_metrics(self.metrics.clone())
    }

    /// Sign in; cached data from any previous user is dropped
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let user = self.session.login(credentials).await?;
        self.cache.clear();
        Ok(user)
    }

    pub async fn logout(&self) {
        self.session.logout().await;
        self.cache.clear();
    }

    /// Flush state and drop cached data
    pub async fn shutdown(&self) {
        if let Err(e) = self.store.persist().await {
            warn!("Failed to persist state on shutdown: {}", e);
        }
        self.cache.clear();
        info!("Fleetdesk client stopped");
    }
}

async fn open_store(config: &ClientConfig) -> (Arc<dyn StateStore>, bool) {
    if config.storage.in_memory {
        return (Arc::new(MemoryStateStore::new()), false);
    }

    let path = config.storage.state_path();
    match FileStateStore::open(&path).await {
        Ok(store) => (Arc::new(store), true),
        Err(e) => {
            warn!(
                "Failed to open state file {:?}, keeping state in memory: {}",
                path, e
            );
            (Arc::new(MemoryStateStore::new()), false)
        }
    }
}
