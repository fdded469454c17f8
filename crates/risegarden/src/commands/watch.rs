//! Continuous polling: prints every new snapshot until Ctrl-C.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use risegarden_core::{Availability, Coordinator, CoordinatorConfig, Garden, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{gardens::GardenRow, util};

/// Serialized form of one snapshot in the structured formats.
#[derive(Serialize)]
struct SnapshotView {
    revision: u64,
    refreshed_at: Option<DateTime<Utc>>,
    gardens: Vec<Garden>,
}

impl From<&Snapshot> for SnapshotView {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            revision: snapshot.revision,
            refreshed_at: snapshot.refreshed_at,
            gardens: snapshot.iter().map(|g| (**g).clone()).collect(),
        }
    }
}

fn render(snapshot: &Snapshot, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    let view = SnapshotView::from(snapshot);

    match global.output {
        OutputFormat::Table => {
            let when = snapshot
                .refreshed_at
                .map_or_else(|| "-".into(), |t| t.format("%H:%M:%S").to_string());
            let table = output::render_list(
                &global.output,
                &view.gardens,
                |g| GardenRow::new(g, color),
                |g| g.id.to_string(),
            )?;
            Ok(format!("revision {} at {when}\n{table}", snapshot.revision))
        }
        // One document per revision, so streams stay line-delimited.
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(&view).map_err(|e| CliError::Render(e.to_string()))
        }
        OutputFormat::Yaml => serde_yaml::to_string(&view)
            .map(|doc| format!("---\n{doc}"))
            .map_err(|e| CliError::Render(e.to_string())),
        OutputFormat::Plain => Ok(view
            .gardens
            .iter()
            .map(|g| format!("{} {} {}", snapshot.revision, g.id, g.online))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub async fn handle(
    mut config: CoordinatorConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.refresh_interval = Duration::from_secs(secs);
    }
    if config.refresh_interval.is_zero() {
        return Err(CliError::Validation {
            field: "refresh_interval_secs".into(),
            reason: "watch needs a non-zero polling interval".into(),
        });
    }

    let coordinator = Coordinator::new(config)?;

    // A transient first failure keeps polling; rejected credentials do not.
    if let Err(e) = coordinator.start().await {
        if e.is_auth() {
            coordinator.shutdown().await;
            return Err(e.into());
        }
        tracing::warn!(error = %e, "initial refresh failed, will retry");
    }

    let result = watch_loop(&coordinator, global).await;
    coordinator.shutdown().await;
    result
}

async fn watch_loop(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut stream = coordinator.subscribe();
    let mut availability = coordinator.availability();

    let current = stream.latest();
    if current.revision > 0 {
        output::print_output(&render(&current, global)?, global.quiet);
        util::report_failures(coordinator, global);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                return Ok(());
            }
            next = stream.changed() => {
                let Some(snapshot) = next else {
                    return Ok(());
                };
                output::print_output(&render(&snapshot, global)?, global.quiet);
                util::report_failures(coordinator, global);
            }
            changed = availability.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = *availability.borrow_and_update();
                match state {
                    Availability::AuthFailed => {
                        return Err(CliError::AuthFailed {
                            message: "credentials rejected while polling".into(),
                        });
                    }
                    Availability::Unavailable if !global.quiet => {
                        eprintln!("Rise cloud unavailable, serving last known state");
                    }
                    _ => {}
                }
            }
        }
    }
}
