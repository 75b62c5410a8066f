//! Application context - dependency injection container

use std::sync::Arc;

use duesync_common::auth::OAuthClient;
use duesync_common::{Clock, SystemClock};
use duesync_core::{ReconcilerOptions, SettingsRepository, SyncReconciler, TokenLifecycleManager};
use duesync_domain::{Config, DueSyncError, Result};
use duesync_infra::integrations::google::{google_oauth_config, GOOGLE_CALENDAR_API_BASE};
use duesync_infra::{
    AesTokenCipher, AutoSyncScheduler, AutoSyncSchedulerConfig, DbManager, GoogleCalendarGateway,
    GoogleTokenRefresher, KeyManager, SqlCipherAssignmentRepository, SqlCipherMappingRepository,
    SqlCipherSettingsRepository, SqlCipherTokenRepository,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::services::ConnectService;

/// Remote endpoints the context talks to.
///
/// Production uses [`Endpoints::google`]; tests point both at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub calendar_api_base: String,
    /// Overrides the OAuth token endpoint when set
    pub token_endpoint: Option<String>,
}

impl Endpoints {
    pub fn google() -> Self {
        Self { calendar_api_base: GOOGLE_CALENDAR_API_BASE.to_string(), token_endpoint: None }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::google()
    }
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub settings: Arc<dyn SettingsRepository>,
    /// Assignment cache, refreshed by the LMS fetcher
    pub assignments: Arc<SqlCipherAssignmentRepository>,
    pub tokens: Arc<TokenLifecycleManager>,
    pub reconciler: Arc<SyncReconciler>,
    pub connect: Arc<ConnectService>,
    scheduler: Mutex<AutoSyncScheduler>,
}

impl AppContext {
    /// Build the context, resolving the database key from config or the
    /// OS keychain.
    pub async fn new(config: Config) -> Result<Self> {
        let key = KeyManager::default().resolve_database_key(&config.database)?;
        Self::with_database_key(config, key, Endpoints::google()).await
    }

    /// Build the context with an explicit database key.
    ///
    /// Never touches the keychain, which keeps tests hermetic.
    pub async fn with_database_key(
        mut config: Config,
        database_key: String,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let cipher = Arc::new(AesTokenCipher::from_database_key(&database_key)?);
        config.database.encryption_key = Some(database_key);

        let db = Arc::new(DbManager::from_config(&config.database)?);
        let migrate = Arc::clone(&db);
        tokio::task::spawn_blocking(move || migrate.run_migrations())
            .await
            .map_err(|e| DueSyncError::Internal(format!("migration task failed: {e}")))??;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut oauth_config = google_oauth_config(&config.oauth);
        if let Some(token_endpoint) = &endpoints.token_endpoint {
            oauth_config.token_endpoint.clone_from(token_endpoint);
        }
        if config.oauth.client_id.is_empty() {
            warn!("oauth.client_id is not configured; connecting accounts will fail");
        }
        let oauth = Arc::new(OAuthClient::new(oauth_config));

        let settings: Arc<dyn SettingsRepository> =
            Arc::new(SqlCipherSettingsRepository::new(Arc::clone(&db)));
        let assignments = Arc::new(SqlCipherAssignmentRepository::new(Arc::clone(&db)));

        let tokens = Arc::new(TokenLifecycleManager::new(
            Arc::new(SqlCipherTokenRepository::new(Arc::clone(&db))),
            cipher,
            Arc::new(GoogleTokenRefresher::new(Arc::clone(&oauth), Arc::clone(&clock))),
            Arc::clone(&clock),
        ));

        let reconciler = Arc::new(
            SyncReconciler::new(
                Arc::<SqlCipherAssignmentRepository>::clone(&assignments),
                Arc::clone(&settings),
                Arc::new(SqlCipherMappingRepository::new(Arc::clone(&db))),
                Arc::clone(&tokens),
                Arc::new(GoogleCalendarGateway::with_base_url(endpoints.calendar_api_base)),
                Arc::clone(&clock),
            )
            .with_options(ReconcilerOptions::from_config(&config.sync)),
        );

        let connect = Arc::new(ConnectService::new(oauth, Arc::clone(&tokens), clock));

        let scheduler = AutoSyncScheduler::with_config(
            AutoSyncSchedulerConfig::from_sync_config(&config.sync),
            Arc::clone(&reconciler),
            Arc::clone(&settings),
        );

        info!(database = %db.path().display(), "application context ready");

        Ok(Self {
            config,
            db,
            settings,
            assignments,
            tokens,
            reconciler,
            connect,
            scheduler: Mutex::new(scheduler),
        })
    }

    /// Start the auto-sync scheduler when enabled in config.
    ///
    /// Returns whether the scheduler is running afterwards.
    pub async fn start_auto_sync(&self) -> Result<bool> {
        if !self.config.sync.auto_sync_enabled {
            info!("auto-sync disabled by configuration");
            return Ok(false);
        }

        let mut scheduler = self.scheduler.lock().await;
        if !scheduler.is_running() {
            scheduler.start().await?;
        }
        Ok(true)
    }

    pub async fn auto_sync_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Stop background work. Safe to call when nothing is running.
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_running() {
            scheduler.stop().await?;
        }
        info!("application context shut down");
        Ok(())
    }
}
