// ── Coordinator snapshot ──

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::garden::{Garden, GardenId};

/// Immutable view of every known garden at one revision.
///
/// Snapshots are shared as `Arc<Snapshot>`; the gardens inside are
/// `Arc<Garden>` so consecutive revisions share the entries that did not
/// change.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Incremented by every refresh cycle that fetched at least one garden.
    pub revision: u64,
    pub gardens: BTreeMap<GardenId, Arc<Garden>>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn garden(&self, id: GardenId) -> Option<&Arc<Garden>> {
        self.gardens.get(&id)
    }

    /// Gardens ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Garden>> {
        self.gardens.values()
    }

    pub fn len(&self) -> usize {
        self.gardens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gardens.is_empty()
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Garden>> {
        self.gardens
            .values()
            .find(|g| g.name.eq_ignore_ascii_case(name))
    }
}
