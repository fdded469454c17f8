//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use risegarden_config::ConfigError;
use risegarden_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Rise Gardens cloud")]
    #[diagnostic(
        code(risegarden::connection_failed),
        help(
            "Check your network connection.\n\
             Details: {message}"
        )
    )]
    ConnectionFailed { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(risegarden::timeout),
        help("Increase the timeout with --timeout or try again later.\nDetails: {message}")
    )]
    Timeout { message: String },

    #[error("No garden could be refreshed: {message}")]
    #[diagnostic(
        code(risegarden::unavailable),
        help("The Rise cloud may be degraded. Run with -v for per-garden errors.")
    )]
    Unavailable { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(risegarden::auth_failed),
        help(
            "Verify the account email and password.\n\
             Run: risegarden config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(risegarden::no_credentials),
        help(
            "Configure credentials with: risegarden config init\n\
             Or set RISE_GARDEN_EMAIL and RISE_GARDEN_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(risegarden::not_found),
        help("Run: risegarden {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error: {message}")]
    #[diagnostic(code(risegarden::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(risegarden::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(risegarden::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: risegarden config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(risegarden::no_config),
        help(
            "Create one with: risegarden config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(risegarden::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(risegarden::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::GardenNotFound { identifier } => CliError::NotFound {
                resource_type: "garden".into(),
                identifier,
                list_command: "gardens list".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { message } => CliError::Timeout { message },

            CoreError::ConnectionFailed { message } => CliError::ConnectionFailed { message },

            CoreError::RefreshFailed { message } => CliError::Unavailable { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            err @ (CoreError::Api { .. }
            | CoreError::InvalidResponse { .. }
            | CoreError::ShutDown
            | CoreError::Internal(_)) => CliError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "bad password".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::GardenNotFound {
                    identifier: "Kitchen".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::Timeout {
                    message: "30s".into(),
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::RefreshFailed {
                    message: "all gardens failed".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::InvalidArgument {
                    message: "level 101".into(),
                },
                exit_code::USAGE,
            ),
            (CoreError::ShutDown, exit_code::GENERAL),
        ];

        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn api_errors_keep_the_status_in_the_message() {
        let err = CliError::from(CoreError::Api {
            status: Some(503),
            message: "maintenance".into(),
        });
        assert!(err.to_string().contains("HTTP 503"), "{err}");
    }
}
