use std::cmp::Ordering;

use serde_json::{json, Value};

use crate::domain::UserKey;
use crate::remote::{RemoteBackend, RemoteStore};
use crate::security::{secure_log, LogLevel};

pub fn watchlist_path(user: &UserKey) -> String {
    format!("watchlists/{}", user.as_str())
}

/// Reads and writes whole watchlist snapshots at `watchlists/{user}`.
///
/// Never fails outward: an unconfigured or unreachable backend reads as an
/// empty snapshot and a rejected write as `false`. The shared `guest` bucket
/// is only used when `guest_sync` is enabled.
#[derive(Debug, Clone)]
pub struct RemoteSync {
    backend: RemoteBackend,
    guest_sync: bool,
}

impl RemoteSync {
    pub fn new(backend: RemoteBackend, guest_sync: bool) -> Self {
        Self { backend, guest_sync }
    }

    pub fn unconfigured() -> Self {
        Self::new(RemoteBackend::Unconfigured, true)
    }

    pub fn backend(&self) -> &RemoteBackend {
        &self.backend
    }

    pub const fn guest_sync(&self) -> bool {
        self.guest_sync
    }

    pub fn is_enabled_for(&self, user: &UserKey) -> bool {
        self.store_for(user).is_some()
    }

    fn store_for(&self, user: &UserKey) -> Option<&dyn RemoteStore> {
        if user.is_guest() && !self.guest_sync {
            return None;
        }
        self.backend.store().map(|store| store.as_ref())
    }

    /// Overwrite the remote snapshot. `true` only when the write landed.
    pub async fn save_snapshot(&self, user: &UserKey, snapshot: &[String]) -> bool {
        let Some(store) = self.store_for(user) else {
            secure_log(
                LogLevel::Info,
                "Remote sync disabled, keeping watchlist local",
                Some(json!({ "user": user.as_str() })),
            );
            return false;
        };

        let path = watchlist_path(user);
        match store.set(&path, json!(snapshot)).await {
            Ok(()) => {
                secure_log(
                    LogLevel::Info,
                    "Watchlist saved to remote store",
                    Some(json!({ "user": user.as_str(), "count": snapshot.len() })),
                );
                true
            }
            Err(error) => {
                secure_log(
                    LogLevel::Error,
                    "Error saving watchlist to remote store",
                    Some(json!({ "user": user.as_str(), "error": error.message() })),
                );
                false
            }
        }
    }

    /// Remote snapshot, or empty when missing or unavailable.
    pub async fn get_snapshot(&self, user: &UserKey) -> Vec<String> {
        let Some(store) = self.store_for(user) else {
            return Vec::new();
        };

        match store.get(&watchlist_path(user)).await {
            Ok(Some(value)) => snapshot_from_value(value),
            Ok(None) => Vec::new(),
            Err(error) => {
                secure_log(
                    LogLevel::Error,
                    "Error loading watchlist from remote store",
                    Some(json!({ "user": user.as_str(), "error": error.message() })),
                );
                Vec::new()
            }
        }
    }
}

/// Accepts an array or an index-keyed object of strings. Non-strings are
/// skipped and duplicates dropped, keeping first occurrences.
fn snapshot_from_value(value: Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| index_order(left, right));
            entries.into_iter().map(|(_, item)| item).collect()
        }
        _ => Vec::new(),
    };

    let mut snapshot: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if let Value::String(id) = item {
            if !id.is_empty() && !snapshot.contains(&id) {
                snapshot.push(id);
            }
        }
    }
    snapshot
}

/// Numeric keys by value, ahead of any non-numeric keys.
fn index_order(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}
