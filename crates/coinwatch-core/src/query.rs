//! Cached fetch with retry, refetch and a stale-result guard.
//!
//! A [`CachedQuery`] owns one URL and publishes its [`QueryState`] through a
//! `tokio::sync::watch` channel. Every run takes a new generation token; a
//! run only publishes while its token is still the latest, so a slow
//! superseded sequence can finish without clobbering the result of a newer
//! one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::watch;

use crate::cache::RequestCache;
use crate::error::ServiceError;
use crate::http_client::{fetch_json, HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::retry::{retry, RetryPolicy};
use crate::security::{secure_log, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Read and write the request cache.
    pub cache: bool,
    /// Total attempts per run.
    pub retries: u32,
    /// Linear backoff step; the n-th failure waits `retry_delay * n`.
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache: true,
            retries: 3,
            retry_delay: Duration::from_millis(1_000),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl QueryOptions {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.retries, self.retry_delay)
    }
}

/// Observable state of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<ServiceError>,
    /// The current `data` was served from the request cache.
    pub from_cache: bool,
    /// Network attempts issued by the run that produced this state.
    pub attempts: u32,
}

pub struct CachedQuery {
    http: Arc<dyn HttpClient>,
    cache: RequestCache,
    options: QueryOptions,
    url: Mutex<String>,
    /// Token of the latest run. Held while publishing.
    generation: Mutex<u64>,
    state: watch::Sender<QueryState>,
}

impl CachedQuery {
    pub fn new(
        http: Arc<dyn HttpClient>,
        cache: RequestCache,
        url: impl Into<String>,
        options: QueryOptions,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            http,
            cache,
            options,
            url: Mutex::new(url.into()),
            generation: Mutex::new(0),
            state,
        }
    }

    pub const fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn url(&self) -> String {
        self.url.lock().expect("query url lock is not poisoned").clone()
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Point the query at a new URL and rerun from the cache check.
    pub async fn set_url(&self, url: impl Into<String>) -> QueryState {
        *self.url.lock().expect("query url lock is not poisoned") = url.into();
        self.run().await
    }

    /// Drop the cached entry for the current URL and fetch again.
    pub async fn refetch(&self) -> QueryState {
        let url = self.url();
        if !url.is_empty() {
            self.cache.invalidate(&url);
        }
        self.run().await
    }

    /// Run the cache-check then fetch sequence for the current URL.
    ///
    /// Returns the state this run computed, which is also the published
    /// state unless a newer run has started in the meantime.
    pub async fn run(&self) -> QueryState {
        let url = self.url();
        let generation = self.begin();

        if url.is_empty() {
            let idle = QueryState::default();
            self.publish(generation, idle.clone());
            return idle;
        }

        self.publish_with(generation, |state| {
            state.loading = true;
            state.error = None;
        });

        if self.options.cache {
            if let Some(data) = self.cache.get(&url) {
                let cached = QueryState {
                    data: Some(data),
                    loading: false,
                    error: None,
                    from_cache: true,
                    attempts: 0,
                };
                self.publish(generation, cached.clone());
                return cached;
            }
        }

        let policy = self.options.retry_policy();
        let timeout = self.options.timeout;
        let outcome = retry(&policy, |attempt| {
            let request = HttpRequest::get(url.clone()).with_timeout(timeout);
            let http = Arc::clone(&self.http);
            let url = url.clone();
            async move {
                let result = fetch_json(http.as_ref(), request).await;
                if let Err(error) = &result {
                    secure_log(
                        LogLevel::Warn,
                        &format!("API call attempt {attempt} failed"),
                        Some(json!({ "url": url, "error": error.message() })),
                    );
                }
                result
            }
        })
        .await;

        let next = match outcome.result {
            Ok(data) => {
                if self.options.cache {
                    self.cache.put(&url, &data);
                }
                QueryState {
                    data: Some(data),
                    loading: false,
                    error: None,
                    from_cache: false,
                    attempts: outcome.attempts,
                }
            }
            Err(error) => {
                secure_log(
                    LogLevel::Error,
                    "API call failed after retries",
                    Some(json!({
                        "url": url,
                        "attempts": outcome.attempts,
                        "error": error.message(),
                    })),
                );
                QueryState {
                    data: self.state().data,
                    loading: false,
                    error: Some(error),
                    from_cache: false,
                    attempts: outcome.attempts,
                }
            }
        };

        self.publish(generation, next.clone());
        next
    }

    fn begin(&self) -> u64 {
        let mut generation = self
            .generation
            .lock()
            .expect("query generation lock is not poisoned");
        *generation += 1;
        *generation
    }

    fn publish(&self, generation: u64, state: QueryState) {
        self.publish_with(generation, move |current| *current = state);
    }

    fn publish_with(&self, generation: u64, change: impl FnOnce(&mut QueryState)) {
        let latest = self
            .generation
            .lock()
            .expect("query generation lock is not poisoned");
        if *latest == generation {
            self.state.send_modify(change);
        }
    }
}
