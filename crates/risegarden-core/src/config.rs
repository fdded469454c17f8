// ── Runtime coordinator configuration ──
//
// Describes *how* to talk to the Rise cloud: credentials, endpoints and
// timing. Never touches disk; the CLI builds one from `risegarden-config`
// and hands it in.

use std::time::Duration;

use risegarden_api::{
    Credentials, DEFAULT_API_BASE, DEFAULT_AUTH_URL, DEFAULT_TOKEN_MARGIN, SessionConfig,
    TransportConfig,
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one account's coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub credentials: Credentials,
    /// Garden API root.
    pub api_base: String,
    /// Identity provider token endpoint.
    pub auth_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Refresh tokens this long before they expire.
    pub token_margin: Duration,
    /// Polling interval. `Duration::ZERO` disables the periodic loop.
    pub refresh_interval: Duration,
}

impl CoordinatorConfig {
    /// Production endpoints and default timing.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base: DEFAULT_API_BASE.into(),
            auth_url: DEFAULT_AUTH_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            token_margin: DEFAULT_TOKEN_MARGIN,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            api_base: self.api_base.clone(),
            auth_url: self.auth_url.clone(),
            transport: TransportConfig::default().with_timeout(self.timeout),
            token_margin: self.token_margin,
        }
    }
}
