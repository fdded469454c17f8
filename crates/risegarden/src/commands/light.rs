//! Light control handlers.

use risegarden_core::{Command, Coordinator, CoordinatorConfig, CoreError, LightCommand as SetLight};

use crate::cli::{GlobalOpts, LightArgs, LightCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    config: CoordinatorConfig,
    args: LightArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (identifier, light) = match args.command {
        LightCommand::On {
            garden,
            brightness,
            level,
        } => {
            let light = match level {
                Some(level) => SetLight::level(level),
                None => SetLight::turn_on(brightness),
            };
            (garden, light)
        }
        LightCommand::Off { garden } => (garden, SetLight::turn_off()),
    };

    let label = Coordinator::oneshot(config, |coordinator| async move {
        let snapshot = coordinator.snapshot();
        let garden = util::resolve_garden(&snapshot, &identifier)
            .map_err(|_| CoreError::GardenNotFound { identifier })?;
        coordinator
            .execute(Command::SetLight { garden, light })
            .await?;
        Ok(util::garden_label(&snapshot, garden))
    })
    .await?;

    if !global.quiet {
        if light.on {
            eprintln!("✓ Light on for '{label}' (level {})", light.level);
        } else {
            eprintln!("✓ Light off for '{label}'");
        }
    }
    Ok(())
}
