// risegarden-core: Garden state coordinator between risegarden-api and consumers (CLI, automations).

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult, LightCommand};
pub use config::{CoordinatorConfig, DEFAULT_REFRESH_INTERVAL, DEFAULT_TIMEOUT};
pub use coordinator::{
    Availability, Coordinator, CycleResult, CycleState, CycleStatus, GardenFailure,
    RefreshOutcome,
};
pub use error::CoreError;
pub use store::SnapshotStore;
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use model::{Garden, GardenId, LightState, Snapshot, TaskSummary, WaterState};

// Credentials are built by callers; re-exported so they need not depend
// on the API crate directly.
pub use risegarden_api::Credentials;
