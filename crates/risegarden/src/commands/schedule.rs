//! Schedule handlers. Schedules are shown as the cloud returns them.

use risegarden_core::{Coordinator, CoordinatorConfig, CoreError};

use crate::cli::{GlobalOpts, ScheduleArgs, ScheduleCommand};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    config: CoordinatorConfig,
    args: ScheduleArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let schedule = Coordinator::oneshot(config, |coordinator| async move {
        let snapshot = coordinator.snapshot();
        let (identifier, pump) = match args.command {
            ScheduleCommand::Light { garden } => (garden, false),
            ScheduleCommand::Pump { garden } => (garden, true),
        };
        let garden = util::resolve_garden(&snapshot, &identifier)
            .map_err(|_| CoreError::GardenNotFound { identifier })?;

        let session = coordinator.session();
        let schedule = if pump {
            session.pump_schedule(garden.get()).await
        } else {
            session.light_schedule(garden.get()).await
        };
        schedule.map_err(CoreError::from)
    })
    .await?;

    let rendered = output::render_single(
        &global.output,
        &schedule,
        |s| serde_json::to_string_pretty(s).unwrap_or_else(|_| s.to_string()),
        ToString::to_string,
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
