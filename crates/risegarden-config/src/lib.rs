//! Shared configuration for the Rise Gardens CLI.
//!
//! TOML account profiles, credential resolution (env + keyring +
//! plaintext), and translation to `risegarden_core::CoordinatorConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use risegarden_core::{CoordinatorConfig, Credentials};

/// Keyring service name.
const KEYRING_SERVICE: &str = "risegarden";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RISE_GARDEN_";
/// Password override honored for every profile.
pub const PASSWORD_ENV: &str = "RISE_GARDEN_PASSWORD";
/// Email override honored for every profile.
pub const EMAIL_ENV: &str = "RISE_GARDEN_EMAIL";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Resolve a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Polling interval in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Token refresh margin in seconds.
    #[serde(default = "default_token_margin")]
    pub token_margin_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout_secs: default_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            token_margin_secs: default_token_margin(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    60
}
fn default_token_margin() -> u64 {
    60
}

/// A named Rise account.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: Option<String>,

    /// Password (plaintext; prefer the keyring or an env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override the garden API root.
    pub api_base: Option<String>,

    /// Override the identity provider token endpoint.
    pub auth_url: Option<String>,

    /// Override the request timeout (seconds).
    pub timeout_secs: Option<u64>,

    /// Override the polling interval (seconds).
    pub refresh_interval_secs: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "risegarden", "risegarden").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("risegarden");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered as defaults → file → env.
///
/// Nested keys use a double underscore, e.g.
/// `RISE_GARDEN_DEFAULTS__REFRESH_INTERVAL_SECS=120`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

/// Resolve account credentials from the process environment and keyring.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(profile, profile_name, |var| std::env::var(var).ok(), true)
}

/// Resolve credentials with an explicit environment lookup.
///
/// Email: profile, then `RISE_GARDEN_EMAIL`. Password: the profile's
/// `password_env` variable, then `RISE_GARDEN_PASSWORD`, then the
/// keyring (when `use_keyring`), then the plaintext value.
pub fn resolve_credentials_with<F>(
    profile: &Profile,
    profile_name: &str,
    env: F,
    use_keyring: bool,
) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let email = profile
        .email
        .clone()
        .or_else(|| env(EMAIL_ENV))
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(no_credentials)?;

    // 1. Profile's password_env → env var lookup
    if let Some(password) = profile.password_env.as_deref().and_then(&env) {
        return Ok(Credentials::new(email, SecretString::from(password)));
    }

    // 2. Global env var
    if let Some(password) = env(PASSWORD_ENV) {
        return Ok(Credentials::new(email, SecretString::from(password)));
    }

    // 3. System keyring
    if use_keyring {
        if let Ok(password) = keyring_entry(profile_name).and_then(|e| e.get_password()) {
            return Ok(Credentials::new(email, SecretString::from(password)));
        }
    }

    // 4. Plaintext in config
    if let Some(password) = &profile.password {
        return Ok(Credentials::new(email, SecretString::from(password.clone())));
    }

    Err(no_credentials())
}

// ── Translation ─────────────────────────────────────────────────────

fn validate_url(field: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected http(s) URL, got '{raw}'"),
        });
    }
    Ok(raw.to_owned())
}

/// Build a `CoordinatorConfig` from a profile and the global defaults.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
    credentials: Credentials,
) -> Result<CoordinatorConfig, ConfigError> {
    let mut config = CoordinatorConfig::new(credentials);

    if let Some(api_base) = &profile.api_base {
        config.api_base = validate_url("api_base", api_base)?;
    }
    if let Some(auth_url) = &profile.auth_url {
        config.auth_url = validate_url("auth_url", auth_url)?;
    }

    let timeout_secs = profile.timeout_secs.unwrap_or(defaults.timeout_secs);
    if timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "timeout_secs".into(),
            reason: "must be at least 1".into(),
        });
    }
    config.timeout = Duration::from_secs(timeout_secs);
    config.token_margin = Duration::from_secs(defaults.token_margin_secs);
    config.refresh_interval = Duration::from_secs(
        profile
            .refresh_interval_secs
            .unwrap_or(defaults.refresh_interval_secs),
    );

    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────────
