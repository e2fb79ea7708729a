use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::ServiceError;

/// Boxed future returned by the transport and remote-store traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-attempt network timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const USER_AGENT: &str = "CoinWatch/1.0";

/// HTTP verbs used by the market-data API and the remote key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(String::from("accept"), String::from("application/json"));
        Self {
            method,
            url: url.into(),
            headers,
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json_body(mut self, body: impl Into<String>) -> Self {
        self.headers.insert(
            String::from("content-type"),
            String::from("application/json"),
        );
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    timed_out: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Async transport used by the fetcher, the cached query and the remote store.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, HttpError>>;
}

/// Issue `request` and decode a JSON body.
///
/// Transport errors, timeouts, non-2xx statuses and undecodable bodies all
/// map to [`ServiceError::network`], which is retryable.
pub async fn fetch_json(http: &dyn HttpClient, request: HttpRequest) -> Result<Value, ServiceError> {
    let timeout_ms = request.timeout_ms;
    let response = http.execute(request).await.map_err(|error| {
        if error.timed_out() {
            ServiceError::network(format!("request timed out after {timeout_ms}ms: {error}"))
        } else {
            ServiceError::network(error.to_string())
        }
    })?;

    if !response.is_success() {
        return Err(ServiceError::network(format!(
            "HTTP error! status: {}",
            response.status
        )));
    }

    serde_json::from_str(&response.body)
        .map_err(|error| ServiceError::network(format!("malformed response body: {error}")))
}

/// Transport that replays a fixed script of outcomes and records every request.
///
/// Once the script runs out the last outcome is repeated.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    last: Mutex<Option<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(script: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails `failures` times with a connection error, then answers `body`.
    pub fn failing_then_ok(failures: usize, body: impl Into<String>) -> Self {
        let mut script = (0..failures)
            .map(|attempt| Err(HttpError::new(format!("connection refused (attempt {})", attempt + 1))))
            .collect::<Vec<_>>();
        script.push(Ok(HttpResponse::ok_json(body)));
        Self::new(script)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .len()
    }

    fn next_outcome(&self) -> Result<HttpResponse, HttpError> {
        let mut script = self
            .script
            .lock()
            .expect("scripted client lock is not poisoned");
        let mut last = self
            .last
            .lock()
            .expect("scripted client lock is not poisoned");
        match script.pop_front() {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(HttpError::new("scripted client has no responses"))),
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
        self.requests
            .lock()
            .expect("scripted client lock is not poisoned")
            .push(request);
        let outcome = self.next_outcome();
        Box::pin(async move { outcome })
    }
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Put => self.client.put(&request.url),
                HttpMethod::Patch => self.client.patch(&request.url),
                HttpMethod::Delete => self.client.delete(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timeout(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timeout(format!("response body timeout: {e}"))
                } else {
                    HttpError::new(format!("failed to read response body: {e}"))
                }
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_default_to_json_and_ten_second_timeout() {
        let request = HttpRequest::get("https://api.example.test/coins/bitcoin");
        assert_eq!(request.timeout_ms, 10_000);
        assert_eq!(
            request.headers.get("accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn json_body_sets_content_type() {
        let request = HttpRequest::new(HttpMethod::Put, "https://db.example.test/a.json")
            .with_json_body(r#"["bitcoin"]"#);
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body.as_deref(), Some(r#"["bitcoin"]"#));
    }

    #[tokio::test]
    async fn scripted_client_replays_then_repeats_last() {
        let client = ScriptedHttpClient::failing_then_ok(1, "[]");

        assert!(client.execute(HttpRequest::get("u")).await.is_err());
        assert_eq!(client.execute(HttpRequest::get("u")).await, Ok(HttpResponse::ok_json("[]")));
        assert_eq!(client.execute(HttpRequest::get("u")).await, Ok(HttpResponse::ok_json("[]")));
        assert_eq!(client.request_count(), 3);
    }

    #[tokio::test]
    async fn fetch_json_classifies_failures_as_network_errors() {
        let client = ScriptedHttpClient::new(vec![
            Ok(HttpResponse::with_status(500, "oops")),
            Ok(HttpResponse::ok_json("not json")),
            Err(HttpError::timeout("deadline elapsed")),
            Ok(HttpResponse::ok_json(r#"{"id":"bitcoin"}"#)),
        ]);

        let status = fetch_json(&client, HttpRequest::get("u")).await.unwrap_err();
        assert_eq!(status.message(), "HTTP error! status: 500");
        assert!(status.retryable());

        let body = fetch_json(&client, HttpRequest::get("u")).await.unwrap_err();
        assert!(body.message().starts_with("malformed response body"));

        let timeout = fetch_json(&client, HttpRequest::get("u")).await.unwrap_err();
        assert!(timeout.message().contains("timed out after 10000ms"));

        let value = fetch_json(&client, HttpRequest::get("u")).await.expect("json body");
        assert_eq!(value["id"], "bitcoin");
    }

    #[tokio::test]
    async fn reqwest_client_reports_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("accept", "application/json")
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let client = ReqwestHttpClient::new();
        let response = client
            .execute(HttpRequest::get(format!("{}/ping", server.url())))
            .await
            .expect("transport succeeds");

        mock.assert_async().await;
        assert_eq!(response.status, 503);
        assert_eq!(response.body, "busy");
        assert!(!response.is_success());
    }
}
