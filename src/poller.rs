use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::FetchError;
use crate::store::SnapshotStore;
use crate::{Snapshot, WorkflowRecord};

/// Source of the check suite tree of a commit.
#[async_trait::async_trait]
pub trait ChecksFeed: Send + Sync {
    async fn fetch_checks(&self, commit_node: &str) -> Result<Vec<WorkflowRecord>, FetchError>;
}

#[async_trait::async_trait]
impl<T: ChecksFeed + ?Sized> ChecksFeed for Arc<T> {
    async fn fetch_checks(&self, commit_node: &str) -> Result<Vec<WorkflowRecord>, FetchError> {
        (**self).fetch_checks(commit_node).await
    }
}

pub struct Poller<F> {
    feed: F,
    commit_node: String,
    interval: Duration,
    store: Arc<SnapshotStore>,
}

impl<F: ChecksFeed + 'static> Poller<F> {
    pub fn new(
        feed: F,
        commit_node: impl Into<String>,
        interval: Duration,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            feed,
            commit_node: commit_node.into(),
            interval,
            store,
        }
    }

    /// Starts polling right away. The task is never cancelled; it lives until
    /// the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Fetches once and publishes on success. Returns whether a snapshot was published.
    pub async fn poll_once(&self) -> bool {
        match self.feed.fetch_checks(&self.commit_node).await {
            Ok(workflows) => {
                let snapshot = Snapshot::new(workflows);
                log::debug!(
                    "Fetched {} workflows at {}",
                    snapshot.workflows.len(),
                    snapshot.fetched_at.format("%H:%M:%S")
                );
                self.store.publish(snapshot);
                true
            }
            Err(error) => {
                log::warn!("Cannot fetch check suites, keeping last snapshot: {error}");
                false
            }
        }
    }
}
