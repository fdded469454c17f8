use thiserror::Error;

/// Top-level error type for the `risegarden-api` crate.
///
/// Covers every failure mode of the vendor surfaces: the identity
/// provider, the garden endpoints, and local argument validation.
/// `risegarden-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Caller misuse ───────────────────────────────────────────────
    /// Argument rejected before any request was sent.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The identity provider rejected the credentials, or the API kept
    /// rejecting freshly minted tokens. Fatal for the session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The API answered 401 for the bearer token. Internal signal: the
    /// session re-authenticates once and retries the single call.
    #[error("Access token rejected -- re-authentication required")]
    TokenExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to build the HTTP client.
    #[error("HTTP client setup failed: {0}")]
    ClientBuild(String),

    // ── Vendor API ──────────────────────────────────────────────────
    /// Non-success HTTP status other than 401.
    #[error("Rise API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for failures that re-authentication cannot fix
    /// and that must be surfaced to the user.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the token should be discarded and minted again.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Returns `true` if this is a transient error the next poll may clear.
    ///
    /// Network-level failures, timeouts, malformed bodies, rate limiting
    /// and vendor-side 5xx responses qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Deserialization { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the request hit the configured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// First 200 characters of a response body, for error messages.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
