//! Device-local watchlist and the user actions that mutate it.
//!
//! The local write always completes before the remote push is queued, and
//! the push is never awaited: the caller sees the local state immediately
//! and a remote failure never reverts it.

use std::sync::Arc;

use coinwatch_store::{LocalStore, StoreError, WATCHLIST_KEY};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::UserKey;
use crate::error::{CoreError, ValidationError};
use crate::push_queue::SnapshotPusher;

/// Ordered set of coin ids persisted under `watchlist`.
#[derive(Clone)]
pub struct Watchlist {
    store: Arc<dyn LocalStore>,
}

impl Watchlist {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Stored ids in insertion order. Duplicates in a hand-edited value are
    /// dropped.
    pub fn load(&self) -> Result<Vec<String>, StoreError> {
        let stored: Vec<String> = self.store.get_json(WATCHLIST_KEY)?.unwrap_or_default();
        let mut ids: Vec<String> = Vec::with_capacity(stored.len());
        for id in stored {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub fn save(&self, ids: &[String]) -> Result<(), StoreError> {
        self.store.set_json(WATCHLIST_KEY, ids)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(WATCHLIST_KEY)
    }
}

/// Blocking yes/no question put to the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// Toast-style message describing the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn added(id: &str) -> Self {
        Self::new(NoticeKind::Success, format!("{} - added to the watchlist", display_name(id)))
    }

    pub fn already_added(id: &str) -> Self {
        Self::new(
            NoticeKind::Error,
            format!("{} - is already added to the watchlist!", display_name(id)),
        )
    }

    pub fn removed(id: &str) -> Self {
        Self::new(NoticeKind::Success, format!("{} - has been removed!", display_name(id)))
    }

    pub fn not_removed(id: &str) -> Self {
        Self::new(NoticeKind::Error, format!("{} - could not be removed!", display_name(id)))
    }

    pub fn not_listed(id: &str) -> Self {
        Self::new(NoticeKind::Info, format!("{} - is not in the watchlist", display_name(id)))
    }

    fn new(kind: NoticeKind, text: String) -> Self {
        Self { kind, text }
    }
}

/// `bitcoin` -> `Bitcoin`.
pub fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn remove_prompt(id: &str) -> String {
    format!("Are you sure you want to remove {} from the watchlist?", display_name(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistOutcome {
    Added,
    AlreadyPresent,
    Removed,
    /// The user declined the confirmation; nothing changed.
    Declined,
    NotPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistUpdate {
    pub outcome: WatchlistOutcome,
    pub items: Vec<String>,
    pub notice: Notice,
    /// Background push queued for this change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_job: Option<Uuid>,
}

impl WatchlistUpdate {
    pub fn changed(&self) -> bool {
        matches!(self.outcome, WatchlistOutcome::Added | WatchlistOutcome::Removed)
    }
}

/// Add/remove actions for the current user.
#[derive(Clone)]
pub struct WatchlistService {
    watchlist: Watchlist,
    pusher: SnapshotPusher,
    user: UserKey,
}

impl WatchlistService {
    pub fn new(watchlist: Watchlist, pusher: SnapshotPusher, user: UserKey) -> Self {
        Self {
            watchlist,
            pusher,
            user,
        }
    }

    pub fn user(&self) -> &UserKey {
        &self.user
    }

    pub fn items(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.watchlist.load()?)
    }

    pub fn add(&self, id: &str) -> Result<WatchlistUpdate, CoreError> {
        let id = require_id(id)?;
        let mut items = self.watchlist.load()?;

        if items.iter().any(|item| item == id) {
            return Ok(WatchlistUpdate {
                outcome: WatchlistOutcome::AlreadyPresent,
                notice: Notice::already_added(id),
                items,
                push_job: None,
            });
        }

        items.push(id.to_owned());
        self.watchlist.save(&items)?;
        let push_job = self.pusher.enqueue(self.user.clone(), items.clone());

        Ok(WatchlistUpdate {
            outcome: WatchlistOutcome::Added,
            notice: Notice::added(id),
            items,
            push_job: Some(push_job),
        })
    }

    /// Remove `id` after `confirm` approves.
    pub fn remove(&self, id: &str, confirm: &dyn Confirm) -> Result<WatchlistUpdate, CoreError> {
        let id = require_id(id)?;

        if !confirm.confirm(&remove_prompt(id)) {
            return Ok(WatchlistUpdate {
                outcome: WatchlistOutcome::Declined,
                items: self.watchlist.load()?,
                notice: Notice::not_removed(id),
                push_job: None,
            });
        }

        let mut items = self.watchlist.load()?;
        let before = items.len();
        items.retain(|item| item != id);
        if items.len() == before {
            return Ok(WatchlistUpdate {
                outcome: WatchlistOutcome::NotPresent,
                notice: Notice::not_listed(id),
                items,
                push_job: None,
            });
        }

        self.watchlist.save(&items)?;
        let push_job = self.pusher.enqueue(self.user.clone(), items.clone());

        Ok(WatchlistUpdate {
            outcome: WatchlistOutcome::Removed,
            notice: Notice::removed(id),
            items,
            push_job: Some(push_job),
        })
    }

    /// Wait for queued pushes to be attempted.
    pub async fn flush(&self) {
        self.pusher.flush().await;
    }
}

fn require_id(id: &str) -> Result<&str, ValidationError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::EmptyCoinId);
    }
    Ok(id)
}
