use std::sync::Arc;

use tokio::sync::watch;

use crate::Snapshot;

/// Holds at most one snapshot. Publishing replaces it wholesale; readers see
/// either the previous or the new snapshot, never a mix of both.
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        // `send_replace` stores the value even when no reader is subscribed.
        self.tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// `None` until the first successful fetch.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.rx.borrow().clone()
    }
}
