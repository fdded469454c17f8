// ── Central snapshot store ──
//
// Holds the current `Arc<Snapshot>` in a `watch` channel. Readers clone
// the `Arc` and never block the writer; the refresh merge is the only
// writer.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::model::{Garden, GardenId, Snapshot};
use crate::stream::SnapshotStream;

/// Reactive store for the garden mapping.
pub struct SnapshotStore {
    pub(crate) snapshot: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        Self { snapshot }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.snapshot.borrow().revision
    }

    pub fn garden(&self, id: GardenId) -> Option<Arc<Garden>> {
        self.snapshot.borrow().garden(id).cloned()
    }

    pub fn garden_count(&self) -> usize {
        self.snapshot.borrow().len()
    }

    /// How long ago the last successful merge happened, or `None` if the
    /// store was never populated.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.snapshot.borrow().refreshed_at.map(|t| Utc::now() - t)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Publish `next`. Stored even when nobody is subscribed.
    pub(crate) fn publish(&self, next: Snapshot) {
        self.snapshot.send_replace(Arc::new(next));
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
