//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod gardens;
pub mod light;
pub mod login;
pub mod pump;
pub mod schedule;
pub mod util;
pub mod watch;

use risegarden_core::CoordinatorConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an account-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    profile: &str,
    config: CoordinatorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => login::handle(config, profile, global).await,
        Command::Gardens(args) => gardens::handle(config, args, global).await,
        Command::Light(args) => light::handle(config, args, global).await,
        Command::Pump(args) => pump::handle(config, args, global).await,
        Command::Schedule(args) => schedule::handle(config, args, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
