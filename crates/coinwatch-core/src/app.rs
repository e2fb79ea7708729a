//! Process-wide wiring of the dashboard services.
//!
//! Everything shared (rate limiter, request cache, local store, push queue)
//! is created once here and handed out by handle.

use std::sync::Arc;

use coinwatch_store::{DuckDbStore, LocalStore, StoreConfig, StoreError};
use serde_json::json;

use crate::cache::RequestCache;
use crate::clock::{SharedClock, SystemClock};
use crate::config::AppConfig;
use crate::coordinator::SyncCoordinator;
use crate::domain::Theme;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::market_client::MarketClient;
use crate::profile::ProfileService;
use crate::push_queue::SnapshotPusher;
use crate::query::{CachedQuery, QueryOptions};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::remote::{FirebaseRestStore, RemoteBackend};
use crate::security::{secure_log, LogLevel};
use crate::sync_service::RemoteSync;
use crate::watchlist::{Watchlist, WatchlistService};

#[derive(Default)]
pub struct DashboardBuilder {
    config: AppConfig,
    store: Option<Arc<dyn LocalStore>>,
    http: Option<Arc<dyn HttpClient>>,
    clock: Option<SharedClock>,
    remote: Option<RemoteBackend>,
}

impl DashboardBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `remote` instead of deriving the backend from the credentials.
    pub fn remote(mut self, remote: RemoteBackend) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Open the default store when none was given and start the push worker.
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Dashboard, StoreError> {
        let store: Arc<dyn LocalStore> = match self.store {
            Some(store) => store,
            None => Arc::new(DuckDbStore::open(StoreConfig::for_home(&self.config.home))?),
        };
        let http: Arc<dyn HttpClient> = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let remote = self.remote.unwrap_or_else(|| {
            let backend = &self.config.backend;
            match (&backend.database_url, backend.is_configured()) {
                (Some(database_url), true) => RemoteBackend::configured(Arc::new(FirebaseRestStore::new(
                    Arc::clone(&http),
                    database_url.clone(),
                    backend.auth_token.clone(),
                ))),
                _ => {
                    secure_log(
                        LogLevel::Info,
                        "Remote backend not configured, using local storage only",
                        None,
                    );
                    RemoteBackend::Unconfigured
                }
            }
        });

        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::api(), Arc::clone(&clock)));
        let cache = RequestCache::new(Arc::clone(&store), Arc::clone(&clock));
        let market = MarketClient::new(Arc::clone(&http), limiter, self.config.api_base.clone());
        let sync = Arc::new(RemoteSync::new(remote.clone(), self.config.guest_sync));
        let pusher = SnapshotPusher::spawn(Arc::clone(&sync));
        let profiles = ProfileService::new(remote, Arc::clone(&clock));

        Ok(Dashboard {
            config: self.config,
            store,
            http,
            cache,
            market,
            sync,
            pusher,
            profiles,
        })
    }
}

pub struct Dashboard {
    config: AppConfig,
    store: Arc<dyn LocalStore>,
    http: Arc<dyn HttpClient>,
    cache: RequestCache,
    market: MarketClient,
    sync: Arc<RemoteSync>,
    pusher: SnapshotPusher,
    profiles: ProfileService,
}

impl Dashboard {
    pub fn builder(config: AppConfig) -> DashboardBuilder {
        DashboardBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn market(&self) -> &MarketClient {
        &self.market
    }

    pub fn sync(&self) -> &RemoteSync {
        &self.sync
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn pusher(&self) -> &SnapshotPusher {
        &self.pusher
    }

    pub fn watchlist(&self) -> Watchlist {
        Watchlist::new(Arc::clone(&self.store))
    }

    pub fn watchlist_service(&self) -> WatchlistService {
        WatchlistService::new(self.watchlist(), self.pusher.clone(), self.config.user.clone())
    }

    pub fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(self.watchlist(), Arc::clone(&self.sync), self.config.merge_policy)
    }

    pub fn query(&self, url: impl Into<String>, options: QueryOptions) -> CachedQuery {
        CachedQuery::new(Arc::clone(&self.http), self.cache.clone(), url, options)
    }

    pub fn theme(&self) -> Result<Theme, StoreError> {
        Theme::load(self.store.as_ref())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
        theme.save(self.store.as_ref())
    }

    /// Hard reset: drop every locally persisted value.
    pub fn reset_local(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        secure_log(
            LogLevel::Warn,
            "Local state cleared",
            Some(json!({ "home": self.config.home.display().to_string() })),
        );
        Ok(())
    }

    /// Wait for queued remote pushes before shutting down.
    pub async fn shutdown(&self) {
        self.pusher.flush().await;
    }
}
