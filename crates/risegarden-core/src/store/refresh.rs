// ── Refresh application logic ──
//
// Applies one cycle's fetched gardens to the store. This is the only code
// path that mutates the garden mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use risegarden_api::{GardenSummary, RawDeviceState};

use super::SnapshotStore;
use crate::model::{Garden, GardenId, Snapshot};

/// A garden whose listing entry and detail payload were both fetched.
#[derive(Debug, Clone)]
pub(crate) struct FetchedGarden {
    pub summary: GardenSummary,
    pub detail: RawDeviceState,
}

impl FetchedGarden {
    pub fn id(&self) -> GardenId {
        GardenId(self.summary.id)
    }

    /// Listing fields overlaid with the detail payload.
    fn combined(&self) -> RawDeviceState {
        self.summary.state.clone().overlay(self.detail.clone())
    }
}

impl SnapshotStore {
    /// Merge a cycle's results and publish the next revision.
    ///
    /// `listed` holds every id in the cycle's listing, fetched or not.
    /// Gardens whose detail failed are left exactly as they were; known
    /// gardens missing from the listing are marked offline. Returns the
    /// new revision, or `None` when nothing was fetched (no revision bump,
    /// no notification).
    pub(crate) fn apply_refresh(
        &self,
        listed: &BTreeSet<GardenId>,
        fetched: &[FetchedGarden],
        observed_at: DateTime<Utc>,
    ) -> Option<u64> {
        if fetched.is_empty() {
            return None;
        }

        let current = self.current();
        let mut gardens = current.gardens.clone();

        for item in fetched {
            let id = item.id();
            let entry = gardens
                .entry(id)
                .or_insert_with(|| Arc::new(Garden::new(id, id.to_string())));
            let garden = Arc::make_mut(entry);
            if let Some(name) = &item.summary.name {
                garden.name.clone_from(name);
            }
            garden.apply(&item.combined(), observed_at);
        }

        mark_unlisted_offline(&mut gardens, listed);
        Some(self.publish_next(gardens, observed_at))
    }

    /// A successful listing with no gardens in it: every known garden is
    /// marked offline. Publishes only when some garden was online.
    pub(crate) fn apply_empty_listing(&self, observed_at: DateTime<Utc>) -> Option<u64> {
        let mut gardens = self.current().gardens.clone();
        if !mark_unlisted_offline(&mut gardens, &BTreeSet::new()) {
            return None;
        }
        Some(self.publish_next(gardens, observed_at))
    }

    fn publish_next(
        &self,
        gardens: BTreeMap<GardenId, Arc<Garden>>,
        observed_at: DateTime<Utc>,
    ) -> u64 {
        let revision = self.revision() + 1;
        self.publish(Snapshot {
            revision,
            gardens,
            refreshed_at: Some(observed_at),
        });
        revision
    }
}

/// Returns whether any garden changed.
fn mark_unlisted_offline(
    gardens: &mut BTreeMap<GardenId, Arc<Garden>>,
    listed: &BTreeSet<GardenId>,
) -> bool {
    let mut changed = false;
    for (id, garden) in gardens.iter_mut() {
        if !listed.contains(id) && garden.online {
            debug!(garden_id = %id, "garden missing from listing, marking offline");
            Arc::make_mut(garden).online = false;
            changed = true;
        }
    }
    changed
}
