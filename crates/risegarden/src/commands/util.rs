//! Shared helpers for command handlers.

use owo_colors::OwoColorize;

use risegarden_core::{Coordinator, GardenId, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Resolve a garden identifier (numeric id or name) via snapshot lookup.
pub fn resolve_garden(snapshot: &Snapshot, identifier: &str) -> Result<GardenId, CliError> {
    let by_id = identifier
        .trim()
        .parse::<u64>()
        .ok()
        .map(GardenId)
        .filter(|id| snapshot.garden(*id).is_some());

    by_id
        .or_else(|| snapshot.find_by_name(identifier.trim()).map(|g| g.id))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "garden".into(),
            identifier: identifier.into(),
            list_command: "gardens list".into(),
        })
}

/// Display name for a garden id, falling back to the id itself.
pub fn garden_label(snapshot: &Snapshot, id: GardenId) -> String {
    snapshot
        .garden(id)
        .map_or_else(|| id.to_string(), |g| g.name.clone())
}

/// Report per-garden failures of the last cycle on stderr.
pub fn report_failures(coordinator: &Coordinator, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    let color = output::should_color(&global.color);
    for failure in coordinator.last_failures() {
        let label = failure
            .name
            .clone()
            .unwrap_or_else(|| failure.garden.to_string());
        let prefix = if color {
            "warning:".yellow().to_string()
        } else {
            "warning:".into()
        };
        eprintln!("{prefix} garden '{label}' not refreshed: {}", failure.error);
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
