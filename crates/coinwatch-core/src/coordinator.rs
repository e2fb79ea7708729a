use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::domain::UserKey;
use crate::error::{CoreError, ValidationError};
use crate::security::{secure_log, LogLevel};
use crate::sync_service::RemoteSync;
use crate::watchlist::Watchlist;

/// How the boot-time sync reconciles local and remote snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Remote is adopted only when local is empty; otherwise local
    /// overwrites remote.
    #[default]
    LastNonEmpty,
    /// Local order first, then remote-only ids; written to both sides.
    Union,
}

impl MergePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastNonEmpty => "last-non-empty",
            Self::Union => "union",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "last-non-empty" => Ok(Self::LastNonEmpty),
            "union" => Ok(Self::Union),
            other => Err(ValidationError::InvalidMergePolicy {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for MergePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Local was empty and took the remote snapshot.
    AdoptedRemote,
    /// Local overwrote the remote snapshot.
    PushedLocal,
    /// Union of both sides was written back.
    Merged,
    Unchanged,
    /// No remote store for this user.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub user: String,
    pub policy: MergePolicy,
    pub action: SyncAction,
    /// Local snapshot after the sync.
    pub local: Vec<String>,
    /// Whether a remote write was attempted and landed.
    pub remote_pushed: bool,
}

/// Boot-time reconciliation of the local watchlist with the remote snapshot.
#[derive(Clone)]
pub struct SyncCoordinator {
    watchlist: Watchlist,
    sync: Arc<RemoteSync>,
    policy: MergePolicy,
}

impl SyncCoordinator {
    pub fn new(watchlist: Watchlist, sync: Arc<RemoteSync>, policy: MergePolicy) -> Self {
        Self {
            watchlist,
            sync,
            policy,
        }
    }

    pub const fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub async fn sync_on_boot(&self, user: &UserKey) -> Result<SyncReport, CoreError> {
        let local = self.watchlist.load()?;

        if !self.sync.is_enabled_for(user) {
            return Ok(self.report(user, SyncAction::Skipped, local, false));
        }

        let remote = self.sync.get_snapshot(user).await;
        let report = match self.policy {
            MergePolicy::LastNonEmpty => self.last_non_empty(user, local, remote).await?,
            MergePolicy::Union => self.union(user, local, remote).await?,
        };

        secure_log(
            LogLevel::Info,
            "Watchlist sync finished",
            Some(json!({
                "user": user.as_str(),
                "policy": self.policy.as_str(),
                "count": report.local.len(),
                "remotePushed": report.remote_pushed,
            })),
        );
        Ok(report)
    }

    async fn last_non_empty(
        &self,
        user: &UserKey,
        local: Vec<String>,
        remote: Vec<String>,
    ) -> Result<SyncReport, CoreError> {
        if local.is_empty() && !remote.is_empty() {
            self.watchlist.save(&remote)?;
            return Ok(self.report(user, SyncAction::AdoptedRemote, remote, false));
        }

        if !local.is_empty() {
            let pushed = self.sync.save_snapshot(user, &local).await;
            return Ok(self.report(user, SyncAction::PushedLocal, local, pushed));
        }

        Ok(self.report(user, SyncAction::Unchanged, local, false))
    }

    async fn union(
        &self,
        user: &UserKey,
        local: Vec<String>,
        remote: Vec<String>,
    ) -> Result<SyncReport, CoreError> {
        let mut merged = local.clone();
        for id in &remote {
            if !merged.contains(id) {
                merged.push(id.clone());
            }
        }

        let local_changed = merged != local;
        let remote_changed = merged != remote;

        if local_changed {
            self.watchlist.save(&merged)?;
        }
        let pushed = if remote_changed {
            self.sync.save_snapshot(user, &merged).await
        } else {
            false
        };

        let action = match (local_changed, remote_changed) {
            (false, false) => SyncAction::Unchanged,
            (true, false) => SyncAction::AdoptedRemote,
            (false, true) => SyncAction::PushedLocal,
            (true, true) => SyncAction::Merged,
        };
        Ok(self.report(user, action, merged, pushed))
    }

    fn report(&self, user: &UserKey, action: SyncAction, local: Vec<String>, remote_pushed: bool) -> SyncReport {
        SyncReport {
            user: user.as_str().to_owned(),
            policy: self.policy,
            action,
            local,
            remote_pushed,
        }
    }
}
