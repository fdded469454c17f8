// ── Core error types ──
//
// User-facing errors from risegarden-core. Consumers never see reqwest
// errors or JSON parse failures directly: the `From<risegarden_api::Error>`
// impl folds them into domain variants. Every variant carries owned strings
// only so that one refresh result can be cloned out to every waiter.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Garden not found: {identifier}")]
    GardenNotFound { identifier: String },

    // ── Authentication ───────────────────────────────────────────────
    /// Fatal for the session: the periodic refresh stops until the user
    /// supplies new credentials.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Transient failures ───────────────────────────────────────────
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Cannot reach Rise cloud: {message}")]
    ConnectionFailed { message: String },

    #[error("Rise API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    #[error("Unexpected response from Rise cloud: {message}")]
    InvalidResponse { message: String },

    /// Every per-garden fetch of a cycle failed.
    #[error("Refresh failed: {message}")]
    RefreshFailed { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Coordinator has been shut down")]
    ShutDown,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Failures the next poll may clear.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::InvalidResponse { .. }
            | Self::RefreshFailed { .. } => true,
            Self::Api { status, .. } => status.is_none_or(|s| s == 429 || s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<risegarden_api::Error> for CoreError {
    fn from(err: risegarden_api::Error) -> Self {
        match err {
            risegarden_api::Error::InvalidArgument { message } => {
                CoreError::InvalidArgument { message }
            }
            risegarden_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            risegarden_api::Error::TokenExpired => CoreError::AuthenticationFailed {
                message: "access token rejected".into(),
            },
            risegarden_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        message: e.to_string(),
                    }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        status: e.status().map(|s| s.as_u16()),
                        message: e.to_string(),
                    }
                }
            }
            risegarden_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            risegarden_api::Error::ClientBuild(message) => CoreError::Config { message },
            risegarden_api::Error::Api { status, message } => CoreError::Api {
                status: Some(status),
                message,
            },
            risegarden_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}
