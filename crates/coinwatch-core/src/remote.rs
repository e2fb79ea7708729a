//! Remote key-value store used for watchlist snapshots and user profiles.
//!
//! Paths are logical (`watchlists/{user}`, `users/{uid}`). Writes are whole
//! overwrites except [`RemoteStore::update`], which merges top-level fields.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::http_client::{BoxFuture, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::retry::{retry, RetryPolicy};

pub trait RemoteStore: Send + Sync {
    /// Value at `path`, or `None` when nothing is stored there.
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, ServiceError>>;

    /// Overwrite `path` with `value`.
    fn set<'a>(&'a self, path: &'a str, value: Value) -> BoxFuture<'a, Result<(), ServiceError>>;

    /// Merge `fields` into the object at `path`.
    fn update<'a>(
        &'a self,
        path: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), ServiceError>>;

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), ServiceError>>;
}

/// Whether a remote store is available at all.
#[derive(Clone, Default)]
pub enum RemoteBackend {
    Configured(Arc<dyn RemoteStore>),
    /// Local-only operation.
    #[default]
    Unconfigured,
}

impl RemoteBackend {
    pub fn configured(store: Arc<dyn RemoteStore>) -> Self {
        Self::Configured(store)
    }

    pub fn store(&self) -> Option<&Arc<dyn RemoteStore>> {
        match self {
            Self::Configured(store) => Some(store),
            Self::Unconfigured => None,
        }
    }

    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured(_) => f.write_str("RemoteBackend::Configured"),
            Self::Unconfigured => f.write_str("RemoteBackend::Unconfigured"),
        }
    }
}

/// Firebase Realtime Database over its REST interface.
///
/// `{database_url}/{path}.json`, with `?auth=` when a token is set. GET reads,
/// PUT overwrites, PATCH merges and DELETE removes. Transport failures and
/// 5xx answers are retried with exponential backoff.
pub struct FirebaseRestStore {
    http: Arc<dyn HttpClient>,
    database_url: String,
    auth_token: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl FirebaseRestStore {
    pub fn new(http: Arc<dyn HttpClient>, database_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            http,
            database_url: database_url.into().trim_end_matches('/').to_owned(),
            auth_token: auth_token.filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::exponential(3),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url_for(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        match &self.auth_token {
            Some(token) => format!(
                "{}/{}.json?auth={}",
                self.database_url,
                encoded,
                urlencoding::encode(token)
            ),
            None => format!("{}/{}.json", self.database_url, encoded),
        }
    }

    async fn send(&self, method: HttpMethod, path: &str, body: Option<&Value>) -> Result<HttpResponse, ServiceError> {
        let url = self.url_for(path);
        let body = body.map(Value::to_string);

        let outcome = retry(&self.retry, |_| {
            let mut request = HttpRequest::new(method, url.clone()).with_timeout(self.timeout);
            if let Some(body) = &body {
                request = request.with_json_body(body.clone());
            }
            async move {
                let response = self
                    .http
                    .execute(request)
                    .await
                    .map_err(|error| ServiceError::network(error.to_string()))?;
                if response.status >= 500 {
                    return Err(ServiceError::network(format!(
                        "remote store returned status {}",
                        response.status
                    )));
                }
                if !response.is_success() {
                    return Err(ServiceError::backend_unavailable(format!(
                        "remote store rejected {} {path} with status {}",
                        method.as_str(),
                        response.status
                    )));
                }
                Ok(response)
            }
        })
        .await;

        outcome.result.map_err(|error| {
            ServiceError::backend_unavailable(format!(
                "remote store unreachable after {} attempt(s): {}",
                outcome.attempts,
                error.message()
            ))
        })
    }
}

impl RemoteStore for FirebaseRestStore {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, ServiceError>> {
        Box::pin(async move {
            let response = self.send(HttpMethod::Get, path, None).await?;
            let value: Value = serde_json::from_str(&response.body).map_err(|error| {
                ServiceError::backend_unavailable(format!("remote store sent invalid JSON: {error}"))
            })?;
            Ok((!value.is_null()).then_some(value))
        })
    }

    fn set<'a>(&'a self, path: &'a str, value: Value) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.send(HttpMethod::Put, path, Some(&value)).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        path: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.send(HttpMethod::Patch, path, Some(&Value::Object(fields)))
                .await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            self.send(HttpMethod::Delete, path, None).await?;
            Ok(())
        })
    }
}

/// In-process remote store with a switch that simulates an outage.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    entries: Mutex<BTreeMap<String, Value>>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Successful `set`, `update` and `remove` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a value without counting it as a write.
    pub fn seed(&self, path: &str, value: Value) {
        self.lock().insert(normalize(path), value);
    }

    pub fn value(&self, path: &str) -> Option<Value> {
        self.lock().get(&normalize(path)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries
            .lock()
            .expect("memory remote store lock is not poisoned")
    }

    fn ensure_online(&self) -> Result<(), ServiceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::backend_unavailable("remote store is offline"));
        }
        Ok(())
    }

    fn write(&self, apply: impl FnOnce(&mut BTreeMap<String, Value>)) -> Result<(), ServiceError> {
        self.ensure_online()?;
        apply(&mut self.lock());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}

impl RemoteStore for MemoryRemoteStore {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, ServiceError>> {
        let result = self.ensure_online().map(|()| self.value(path));
        Box::pin(async move { result })
    }

    fn set<'a>(&'a self, path: &'a str, value: Value) -> BoxFuture<'a, Result<(), ServiceError>> {
        let result = self.write(|entries| {
            entries.insert(normalize(path), value);
        });
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        path: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        let result = self.write(|entries| {
            let entry = entries
                .entry(normalize(path))
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(existing) = entry {
                existing.extend(fields);
            }
        });
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), ServiceError>> {
        let result = self.write(|entries| {
            entries.remove(&normalize(path));
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;
    use crate::http_client::{HttpError, ReqwestHttpClient, ScriptedHttpClient};
    use serde_json::json;

    #[test]
    fn urls_encode_segments_and_token() {
        let store = FirebaseRestStore::new(
            Arc::new(ScriptedHttpClient::default()),
            "https://demo.firebaseio.com/",
            Some(String::from("a b&c")),
        );
        assert_eq!(
            store.url_for("watchlists/user 1"),
            "https://demo.firebaseio.com/watchlists/user%201.json?auth=a%20b%26c"
        );
    }

    #[tokio::test]
    async fn memory_store_merges_updates_and_simulates_outages() {
        let store = MemoryRemoteStore::new();
        store.seed("users/u1", json!({ "email": "a@b.c", "favoriteCoins": [] }));

        let mut fields = Map::new();
        fields.insert(String::from("favoriteCoins"), json!(["bitcoin"]));
        store.update("users/u1", fields).await.expect("update");

        assert_eq!(
            store.value("users/u1"),
            Some(json!({ "email": "a@b.c", "favoriteCoins": ["bitcoin"] }))
        );
        assert_eq!(store.writes(), 1);

        store.set_offline(true);
        let error = store.get("users/u1").await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::BackendUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn firebase_store_retries_transport_failures() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::ok_json(r#"["bitcoin"]"#)),
        ]));
        let store = FirebaseRestStore::new(http.clone(), "https://demo.firebaseio.com", None);

        let value = store.get("watchlists/guest").await.expect("second attempt succeeds");

        assert_eq!(value, Some(json!(["bitcoin"])));
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn firebase_store_gives_up_after_its_retry_budget() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::with_status(
            503,
            "",
        ))]));
        let store = FirebaseRestStore::new(http.clone(), "https://demo.firebaseio.com", None)
            .with_retry(RetryPolicy::linear(2, Duration::from_millis(50)));

        let error = store.get("watchlists/guest").await.unwrap_err();

        assert_eq!(error.kind(), ServiceErrorKind::BackendUnavailable);
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn firebase_store_does_not_retry_rejections() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::with_status(
            401,
            r#"{"error":"Permission denied"}"#,
        ))]));
        let store = FirebaseRestStore::new(http.clone(), "https://demo.firebaseio.com", None);

        let error = store.set("watchlists/guest", json!([])).await.unwrap_err();

        assert_eq!(error.kind(), ServiceErrorKind::BackendUnavailable);
        assert_eq!(http.request_count(), 1);
    }

    #[tokio::test]
    async fn firebase_store_speaks_rest() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/watchlists/u1.json")
            .match_body(mockito::Matcher::Json(json!(["bitcoin", "ethereum"])))
            .with_status(200)
            .with_body(r#"["bitcoin","ethereum"]"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/watchlists/missing.json")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let store = FirebaseRestStore::new(Arc::new(ReqwestHttpClient::new()), server.url(), None);
        store
            .set("watchlists/u1", json!(["bitcoin", "ethereum"]))
            .await
            .expect("put succeeds");
        let missing = store.get("watchlists/missing").await.expect("get succeeds");

        put.assert_async().await;
        get.assert_async().await;
        assert_eq!(missing, None);
    }
}
