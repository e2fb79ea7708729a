//! Persistent request cache keyed by URL.
//!
//! Entries live in the device-local store under `api_{url}` as
//! `{"data": <payload>, "timestamp": <unix ms>}`. An entry is fresh while
//! `now - timestamp < ttl`; stale entries are left in place until they are
//! overwritten or pruned.

use std::sync::Arc;
use std::time::Duration;

use coinwatch_store::{LocalStore, API_CACHE_PREFIX};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::clock::SharedClock;
use crate::security::{secure_log, LogLevel};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// How a request interacts with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a fresh entry if present, otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Drop any entry, fetch, and store the new response.
    Refresh,
    /// Neither read nor write the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Stored form of a cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: u64,
}

/// Request cache over a [`LocalStore`].
#[derive(Clone)]
pub struct RequestCache {
    store: Arc<dyn LocalStore>,
    clock: SharedClock,
    ttl: Duration,
}

impl RequestCache {
    pub fn new(store: Arc<dyn LocalStore>, clock: SharedClock) -> Self {
        Self::with_ttl(store, clock, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn LocalStore>, clock: SharedClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn key_for(url: &str) -> String {
        format!("{API_CACHE_PREFIX}{url}")
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `url`, if any. Unreadable entries count as misses.
    pub fn get(&self, url: &str) -> Option<Value> {
        let entry = self.read_entry(&Self::key_for(url))?;
        self.is_fresh(&entry).then_some(entry.data)
    }

    pub fn put(&self, url: &str, data: &Value) {
        let key = Self::key_for(url);
        let entry = json!({ "data": data, "timestamp": self.clock.now_ms() });
        if let Err(error) = self.store.set_json(&key, &entry) {
            secure_log(
                LogLevel::Warn,
                "Failed to write request cache entry",
                Some(json!({ "url": url, "error": error.to_string() })),
            );
        }
    }

    pub fn invalidate(&self, url: &str) {
        if let Err(error) = self.store.remove(&Self::key_for(url)) {
            secure_log(
                LogLevel::Warn,
                "Failed to invalidate request cache entry",
                Some(json!({ "url": url, "error": error.to_string() })),
            );
        }
    }

    /// Remove stale or unreadable entries; returns how many were dropped.
    pub fn clear_expired(&self) -> usize {
        self.cached_keys()
            .into_iter()
            .filter(|key| {
                let expired = self
                    .read_entry(key)
                    .is_none_or(|entry| !self.is_fresh(&entry));
                expired && self.store.remove(key).is_ok()
            })
            .count()
    }

    /// Remove every cached response; returns how many were dropped.
    pub fn clear(&self) -> usize {
        self.cached_keys()
            .into_iter()
            .filter(|key| self.store.remove(key).is_ok())
            .count()
    }

    pub fn len(&self) -> usize {
        self.cached_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let age_ms = self.clock.now_ms().saturating_sub(entry.timestamp);
        u128::from(age_ms) < self.ttl.as_millis()
    }

    fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get_json::<CacheEntry>(key) {
            Ok(entry) => entry,
            Err(error) => {
                secure_log(
                    LogLevel::Warn,
                    "Ignoring unreadable request cache entry",
                    Some(json!({ "key": key, "error": error.to_string() })),
                );
                None
            }
        }
    }

    fn cached_keys(&self) -> Vec<String> {
        self.store
            .keys_with_prefix(API_CACHE_PREFIX)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use coinwatch_store::MemoryStore;

    const URL: &str = "https://api.coingecko.com/api/v3/coins/bitcoin";

    fn cache() -> (Arc<ManualClock>, Arc<MemoryStore>, RequestCache) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(MemoryStore::new());
        let cache = RequestCache::new(store.clone(), clock.clone());
        (clock, store, cache)
    }

    #[test]
    fn serves_entries_younger_than_five_minutes() {
        let (clock, _store, cache) = cache();
        cache.put(URL, &json!({ "id": "bitcoin" }));

        clock.advance(Duration::from_millis(299_999));
        assert_eq!(cache.get(URL), Some(json!({ "id": "bitcoin" })));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get(URL), None);
    }

    #[test]
    fn stores_data_and_timestamp_under_api_prefix() {
        let (_clock, store, cache) = cache();
        cache.put(URL, &json!([1, 2]));

        let raw = store
            .get(&format!("api_{URL}"))
            .expect("get")
            .expect("entry present");
        let entry: CacheEntry = serde_json::from_str(&raw).expect("entry json");
        assert_eq!(entry, CacheEntry { data: json!([1, 2]), timestamp: 1_000_000 });
    }

    #[test]
    fn invalidate_forces_a_miss() {
        let (_clock, _store, cache) = cache();
        cache.put(URL, &json!(1));
        cache.invalidate(URL);
        assert_eq!(cache.get(URL), None);
    }

    #[test]
    fn corrupt_entries_are_misses_and_get_pruned() {
        let (_clock, store, cache) = cache();
        store.set(&RequestCache::key_for(URL), "{not json").expect("set");

        assert_eq!(cache.get(URL), None);
        assert_eq!(cache.clear_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_expired_keeps_fresh_entries_and_unrelated_keys() {
        let (clock, store, cache) = cache();
        store.set("watchlist", r#"["bitcoin"]"#).expect("set");
        cache.put("https://a.test", &json!("old"));
        clock.advance(Duration::from_secs(200));
        cache.put("https://b.test", &json!("new"));
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.get("https://b.test"), Some(json!("new")));
        assert!(store.get("watchlist").expect("get").is_some());

        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_modes() {
        assert_eq!(CacheMode::default(), CacheMode::Use);
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}
