// ── Garden domain model ──
//
// Canonical representation of one garden's observable state. Built from
// the vendor's raw telemetry by `convert` and owned by the snapshot store;
// consumers only ever see `Arc` snapshots of it.

pub mod garden;
pub mod snapshot;

pub use garden::{Garden, GardenId, LightState, TaskSummary, WaterState};
pub use snapshot::Snapshot;
