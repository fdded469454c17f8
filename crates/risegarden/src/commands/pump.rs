//! Pump control handlers.

use risegarden_core::{Command, Coordinator, CoordinatorConfig, CoreError};

use crate::cli::{GlobalOpts, PumpArgs, PumpCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: CoordinatorConfig,
    args: PumpArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (identifier, on) = match args.command {
        PumpCommand::On { garden } => (garden, true),
        PumpCommand::Off { garden } => (garden, false),
    };

    let label = Coordinator::oneshot(config, |coordinator| async move {
        let snapshot = coordinator.snapshot();
        let garden = util::resolve_garden(&snapshot, &identifier)
            .map_err(|_| CoreError::GardenNotFound { identifier })?;
        coordinator.execute(Command::SetPump { garden, on }).await?;
        Ok(util::garden_label(&snapshot, garden))
    })
    .await?;

    if !global.quiet {
        let state = if on { "started" } else { "stopped" };
        eprintln!("✓ Pump {state} for '{label}'");
    }
    Ok(())
}
