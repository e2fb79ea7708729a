//! Background queue for fire-and-forget snapshot pushes.
//!
//! Callers enqueue a snapshot and move on; one worker task drains the queue
//! in order and logs failures with the job id. [`SnapshotPusher::flush`]
//! waits until everything enqueued before it has been attempted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::UserKey;
use crate::security::{secure_log, LogLevel};
use crate::sync_service::RemoteSync;

enum Job {
    Push {
        id: Uuid,
        user: UserKey,
        snapshot: Vec<String>,
    },
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct PushStats {
    pushed: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct SnapshotPusher {
    jobs: mpsc::UnboundedSender<Job>,
    stats: Arc<PushStats>,
}

impl SnapshotPusher {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(sync: Arc<RemoteSync>) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let stats = Arc::new(PushStats::default());
        let worker_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                match job {
                    Job::Push { id, user, snapshot } => {
                        if sync.save_snapshot(&user, &snapshot).await {
                            worker_stats.pushed.fetch_add(1, Ordering::SeqCst);
                        } else {
                            worker_stats.failed.fetch_add(1, Ordering::SeqCst);
                            secure_log(
                                LogLevel::Warn,
                                "Background watchlist push did not reach the remote store",
                                Some(json!({ "job": id.to_string(), "user": user.as_str() })),
                            );
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { jobs, stats }
    }

    /// Queue a push of `snapshot` for `user` and return its job id.
    pub fn enqueue(&self, user: UserKey, snapshot: Vec<String>) -> Uuid {
        let id = Uuid::new_v4();
        if self.jobs.send(Job::Push { id, user, snapshot }).is_err() {
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            secure_log(
                LogLevel::Error,
                "Push queue worker is gone, dropping watchlist push",
                Some(json!({ "job": id.to_string() })),
            );
        }
        id
    }

    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Pushes that reached the remote store.
    pub fn pushed(&self) -> usize {
        self.stats.pushed.load(Ordering::SeqCst)
    }

    /// Pushes that were skipped or rejected.
    pub fn failed(&self) -> usize {
        self.stats.failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryRemoteStore, RemoteBackend};

    #[tokio::test]
    async fn pushes_in_order_and_counts_outcomes() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = Arc::new(RemoteSync::new(RemoteBackend::configured(remote.clone()), true));
        let pusher = SnapshotPusher::spawn(sync);
        let user = UserKey::User(String::from("u1"));

        let first = pusher.enqueue(user.clone(), vec![String::from("bitcoin")]);
        let second = pusher.enqueue(user.clone(), vec![String::from("bitcoin"), String::from("ethereum")]);
        pusher.flush().await;

        assert_ne!(first, second);
        assert_eq!(pusher.pushed(), 2);
        assert_eq!(remote.value("watchlists/u1"), Some(json!(["bitcoin", "ethereum"])));

        remote.set_offline(true);
        pusher.enqueue(user, vec![]);
        pusher.flush().await;
        assert_eq!(pusher.failed(), 1);
    }
}
