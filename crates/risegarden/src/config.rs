//! Bridges `risegarden-config` with the global CLI flags.
//!
//! Core never sees these types -- it receives a pre-built `CoordinatorConfig`.

use std::path::PathBuf;
use std::time::Duration;

use risegarden_config::{Config, Profile};
use risegarden_core::CoordinatorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` when given, the platform path otherwise.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(risegarden_config::config_path)
}

/// Load the full Config from file + environment.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(risegarden_config::load_config_from(&config_path(global))?)
}

pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<PathBuf, CliError> {
    let path = config_path(global);
    risegarden_config::save_config_to(cfg, &path)?;
    Ok(path)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, for help text.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI
/// overrides. Returns the profile name alongside.
pub fn coordinator_config(global: &GlobalOpts) -> Result<(String, CoordinatorConfig), CliError> {
    let cfg = load(global)?;
    let profile_name = active_profile_name(global, &cfg);

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => from_profile(&cfg, profile, &profile_name)?,

        // An explicitly named profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }

        // No profile at all: environment credentials alone are enough.
        None => match from_profile(&cfg, &Profile::default(), &profile_name) {
            Err(CliError::NoCredentials { .. }) if cfg.profiles.is_empty() => {
                return Err(CliError::NoConfig {
                    path: config_path(global).display().to_string(),
                });
            }
            other => other?,
        },
    };

    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.timeout = Duration::from_secs(secs);
    }

    Ok((profile_name, config))
}

fn from_profile(
    cfg: &Config,
    profile: &Profile,
    profile_name: &str,
) -> Result<CoordinatorConfig, CliError> {
    let credentials = risegarden_config::resolve_credentials(profile, profile_name)?;
    risegarden_config::profile_to_coordinator_config(profile, &cfg.defaults, credentials)
        .map_err(CliError::from)
}

/// Look up a profile for editing, with the available names on failure.
pub fn require_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    cfg.profiles.get(name).ok_or_else(|| CliError::ProfileNotFound {
        name: name.into(),
        available: available_profiles(cfg),
    })
}
