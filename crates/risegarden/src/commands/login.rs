//! Credential check.

use risegarden_core::{Coordinator, CoordinatorConfig, CoreError};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(
    config: CoordinatorConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = config.credentials.email.clone();
    let coordinator = Coordinator::new(config)?;

    let verified = coordinator.session().verify().await.map_err(CoreError::from);
    coordinator.shutdown().await;
    let gardens = verified?;

    tracing::debug!(profile, gardens = gardens.len(), "credentials verified");
    if !global.quiet {
        eprintln!(
            "✓ Signed in as {email} (profile '{profile}'): {} garden(s)",
            gardens.len()
        );
    }
    Ok(())
}
