// ── Reactive snapshot store ──
//
// Copy-on-write garden storage with push-based change notification.

mod refresh;
mod snapshot_store;

pub(crate) use refresh::FetchedGarden;
pub use snapshot_store::SnapshotStore;
