//! # Coinwatch Core
//!
//! Market-data fetching, request caching and watchlist synchronization for
//! the coinwatch cryptocurrency dashboard.
//!
//! ## Overview
//!
//! - **Rate limiter** gating outbound calls per key with a sliding window
//! - **Market client** with input validation, fixed timeouts and audit logging
//! - **Cached query** with a TTL cache in local storage, linear retry and a
//!   stale-result guard
//! - **Watchlist** kept on the device and pushed to a remote store in the
//!   background
//! - **Sync coordinator** reconciling local and remote snapshots at boot
//! - **Profiles** with a favorites list stored in the remote profile document
//!
//! Without backend credentials everything runs local-only: remote reads come
//! back empty, remote writes report `false`, and nothing fails.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`app`] | Service wiring ([`Dashboard`]) |
//! | [`cache`] | Persistent request cache |
//! | [`clock`] | Injectable clock |
//! | [`config`] | Environment configuration |
//! | [`coordinator`] | Boot-time watchlist sync and merge policies |
//! | [`domain`] | Coin ids, market payloads, users, theme |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`market_client`] | Market-data API operations |
//! | [`profile`] | User profiles and favorites |
//! | [`push_queue`] | Background snapshot pushes |
//! | [`query`] | Cached fetch with retry |
//! | [`rate_limit`] | Sliding-window rate limiter |
//! | [`remote`] | Remote key-value store |
//! | [`retry`] | Backoff policies |
//! | [`security`] | Log sanitization |
//! | [`supervisor`] | Fault barrier |
//! | [`sync_service`] | Remote watchlist snapshots |
//! | [`watchlist`] | Local watchlist and user actions |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coinwatch_core::{AppConfig, Dashboard, HistoryDays, ChartSeries};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = Dashboard::builder(AppConfig::from_env()?).build()?;
//!
//!     let report = dashboard.coordinator().sync_on_boot(&dashboard.config().user).await?;
//!     println!("watchlist: {:?}", report.local);
//!
//!     let prices = dashboard
//!         .market()
//!         .price_history("bitcoin", HistoryDays::new(30), ChartSeries::Prices)
//!         .await?;
//!     println!("{} points", prices.len());
//!
//!     dashboard.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌────────────────┐      ┌──────────────┐
//! │ CachedQuery  │─────▶│ RequestCache   │─────▶│ LocalStore   │
//! └──────┬───────┘      └────────────────┘      └──────▲───────┘
//!        │                                             │
//!        ▼                                             │
//! ┌──────────────┐      ┌────────────────┐      ┌──────┴───────┐
//! │ HttpClient   │◀─────│ MarketClient   │      │ Watchlist    │
//! └──────▲───────┘      │ + RateLimiter  │      └──────┬───────┘
//!        │              └────────────────┘             │
//!        │                                             ▼
//! ┌──────┴───────┐      ┌────────────────┐      ┌──────────────┐
//! │ RemoteStore  │◀─────│ RemoteSync     │◀─────│ PushQueue /  │
//! │ (Firebase)   │      └────────────────┘      │ Coordinator  │
//! └──────────────┘                              └──────────────┘
//! ```

pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod market_client;
pub mod profile;
pub mod push_queue;
pub mod query;
pub mod rate_limit;
pub mod remote;
pub mod retry;
pub mod security;
pub mod supervisor;
pub mod sync_service;
pub mod watchlist;

pub use app::{Dashboard, DashboardBuilder};
pub use cache::{CacheEntry, CacheMode, RequestCache, DEFAULT_CACHE_TTL};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{AppConfig, BackendConfig};
pub use coordinator::{MergePolicy, SyncAction, SyncCoordinator, SyncReport};
pub use domain::{
    ChartPoint, ChartSeries, CoinDetail, CoinId, CoinMarket, HistoryDays, MarketChart, Theme,
    UserKey, GUEST_ID,
};
pub use error::{CoreError, ServiceError, ServiceErrorKind, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use market_client::{MarketClient, DEFAULT_API_BASE};
pub use profile::{Preferences, ProfileService, ProfileUpdate, SignUpForm, UserProfile};
pub use push_queue::SnapshotPusher;
pub use query::{CachedQuery, QueryOptions, QueryState};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use remote::{FirebaseRestStore, MemoryRemoteStore, RemoteBackend, RemoteStore};
pub use retry::{Backoff, RetryPolicy};
pub use security::{sanitize_input, secure_log, LogLevel};
pub use supervisor::{Fault, FaultBarrier};
pub use sync_service::RemoteSync;
pub use watchlist::{
    Confirm, Notice, NoticeKind, Watchlist, WatchlistOutcome, WatchlistService, WatchlistUpdate,
};
