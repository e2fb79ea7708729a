//! # Coinwatch Store
//!
//! Device-local key-value persistence for coinwatch.
//!
//! ## Overview
//!
//! Everything the dashboard keeps on the device lives behind the
//! [`LocalStore`] trait as string values addressed by string keys:
//!
//! | Key | Value |
//! |-----|-------|
//! | `watchlist` | JSON array of coin identifiers |
//! | `api_{url}` | JSON `{data, timestamp}` request cache entry |
//! | `theme` | `"dark"` or `"light"` |
//!
//! Two backends are provided:
//!
//! - [`DuckDbStore`]: a single `kv_entries` table in a `DuckDB` file under
//!   the coinwatch home directory
//! - [`MemoryStore`]: a mutex-guarded map for tests and ephemeral sessions
//!
//! Access is synchronous; callers never suspend on local storage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coinwatch_store::{DuckDbStore, LocalStore};
//!
//! fn main() -> Result<(), coinwatch_store::StoreError> {
//!     let store = DuckDbStore::open_default()?;
//!     store.set("theme", "light")?;
//!     assert_eq!(store.get("theme")?.as_deref(), Some("light"));
//!     Ok(())
//! }
//! ```

pub mod duckdb;
mod memory;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use crate::duckdb::{ConnectionPool, PooledConnection};
pub use memory::MemoryStore;

/// Key holding the device-local watchlist snapshot.
pub const WATCHLIST_KEY: &str = "watchlist";
/// Key holding the UI theme preference.
pub const THEME_KEY: &str = "theme";
/// Prefix of request cache entries.
pub const API_CACHE_PREFIX: &str = "api_";

/// Errors raised by local store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the store directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded as JSON.
    #[error("value under '{key}' is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous string key-value store on the device.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Drop every entry.
    fn clear(&self) -> Result<(), StoreError>;
}

impl dyn LocalStore {
    /// Read and decode a JSON value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Json {
                key: key.to_owned(),
                source,
            })
    }

    /// Encode and write a JSON value.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Json {
            key: key.to_owned(),
            source,
        })?;
        self.set(key, &raw)
    }
}

/// Location of the on-device database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for coinwatch data.
    pub coinwatch_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept around.
    pub max_pool_size: usize,
}

impl StoreConfig {
    pub fn for_home(coinwatch_home: impl Into<PathBuf>) -> Self {
        let coinwatch_home = coinwatch_home.into();
        let db_path = coinwatch_home.join("store").join("local.duckdb");
        Self {
            coinwatch_home,
            db_path,
            max_pool_size: 2,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::for_home(resolve_coinwatch_home())
    }
}

/// `DuckDB`-backed [`LocalStore`].
#[derive(Clone)]
pub struct DuckDbStore {
    pool: ConnectionPool,
}

impl DuckDbStore {
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(StoreConfig::default())
    }

    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_pool_size)?;
        let connection = pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        drop(connection);

        Ok(Self { pool })
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }
}

impl LocalStore for DuckDbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let connection = self.pool.acquire()?;
        let value = connection.query_row(
            "SELECT value FROM kv_entries WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match value {
            Ok(value) => Ok(Some(value)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let connection = self.pool.acquire()?;
        connection.execute(
            "INSERT OR REPLACE INTO kv_entries (key, value, updated_at) \
             VALUES (?, ?, CURRENT_TIMESTAMP)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let connection = self.pool.acquire()?;
        connection.execute("DELETE FROM kv_entries WHERE key = ?", params![key])?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection
            .prepare("SELECT key FROM kv_entries WHERE starts_with(key, ?) ORDER BY key")?;
        let rows = statement.query_map(params![prefix], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let connection = self.pool.acquire()?;
        connection.execute_batch("DELETE FROM kv_entries")?;
        Ok(())
    }
}

/// Resolve the coinwatch home directory from environment or default.
pub fn resolve_coinwatch_home() -> PathBuf {
    if let Some(path) = env::var_os("COINWATCH_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".coinwatch");
    }

    PathBuf::from(".coinwatch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn open_temp_store() -> (tempfile::TempDir, DuckDbStore) {
        let temp = tempdir().expect("tempdir");
        let store = DuckDbStore::open(StoreConfig::for_home(temp.path().join("home")))
            .expect("store open");
        (temp, store)
    }

    #[test]
    fn creates_database_under_home_directory() {
        let (temp, store) = open_temp_store();
        assert!(store.db_path().starts_with(temp.path()));
        assert!(store.db_path().exists());
    }

    #[test]
    fn set_get_overwrite_and_remove() {
        let (_temp, store) = open_temp_store();

        assert_eq!(store.get("theme").expect("get"), None);

        store.set("theme", "dark").expect("set");
        store.set("theme", "light").expect("overwrite");
        assert_eq!(store.get("theme").expect("get").as_deref(), Some("light"));

        store.remove("theme").expect("remove");
        store.remove("theme").expect("second remove is a no-op");
        assert_eq!(store.get("theme").expect("get"), None);
    }

    #[test]
    fn lists_keys_by_prefix() {
        let (_temp, store) = open_temp_store();
        store.set("api_https://b.test", "{}").expect("set");
        store.set("api_https://a.test", "{}").expect("set");
        store.set("watchlist", "[]").expect("set");

        let keys = store.keys_with_prefix(API_CACHE_PREFIX).expect("keys");
        assert_eq!(keys, vec!["api_https://a.test", "api_https://b.test"]);
    }

    #[test]
    fn values_survive_reopen() {
        let temp = tempdir().expect("tempdir");
        let config = StoreConfig::for_home(temp.path().join("home"));

        {
            let store = DuckDbStore::open(config.clone()).expect("open");
            store.set(WATCHLIST_KEY, r#"["bitcoin"]"#).expect("set");
        }

        let reopened = DuckDbStore::open(config).expect("reopen");
        assert_eq!(
            reopened.get(WATCHLIST_KEY).expect("get").as_deref(),
            Some(r#"["bitcoin"]"#)
        );
    }

    #[test]
    fn json_helpers_round_trip_through_trait_object() {
        let (_temp, store) = open_temp_store();
        let store: Arc<dyn LocalStore> = Arc::new(store);

        store
            .set_json(WATCHLIST_KEY, &vec!["bitcoin", "ethereum"])
            .expect("set json");
        let list: Option<Vec<String>> = store.get_json(WATCHLIST_KEY).expect("get json");
        assert_eq!(list, Some(vec![String::from("bitcoin"), String::from("ethereum")]));
    }

    #[test]
    fn malformed_json_reports_the_key() {
        let (_temp, store) = open_temp_store();
        store.set(WATCHLIST_KEY, "not json").expect("set");
        let store: Arc<dyn LocalStore> = Arc::new(store);

        let error = store
            .get_json::<Vec<String>>(WATCHLIST_KEY)
            .expect_err("must fail");
        assert!(matches!(error, StoreError::Json { ref key, .. } if key == WATCHLIST_KEY));
    }

    #[test]
    fn clear_drops_everything() {
        let (_temp, store) = open_temp_store();
        store.set("a", "1").expect("set");
        store.set("b", "2").expect("set");
        store.clear().expect("clear");
        assert!(store.keys_with_prefix("").expect("keys").is_empty());
    }
}
