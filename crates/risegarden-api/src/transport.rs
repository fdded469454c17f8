// Shared transport configuration for building reqwest::Client instances.
//
// The identity provider and the garden endpoints share timeout and header
// settings through this module, so every request looks like it came from
// the vendor's mobile app.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

/// Mobile-app release the vendor API expects to talk to.
const APP_VERSION: &str = "3.3.16";
const APP_PLATFORM: &str = "android";
const USER_AGENT: &str = "okhttp/3.14.9";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for every request, connect included.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Injects the vendor app headers (`accept`, `platform`, `version`) as
    /// defaults; the bearer token is attached per request.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("platform", HeaderValue::from_static(APP_PLATFORM));
        headers.insert("version", HeaderValue::from_static(APP_VERSION));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| crate::error::Error::ClientBuild(e.to_string()))
    }
}
