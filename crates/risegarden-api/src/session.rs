// Authenticated session: token manager + garden client
//
// Every call goes through `authorized`, which fetches a valid token,
// and on a 401 discards that token, re-authenticates once and retries the
// single call. A second 401 in a row is escalated to an authentication
// failure.

use std::future::Future;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::auth::{Credentials, DEFAULT_AUTH_URL, DEFAULT_TOKEN_MARGIN, Token, TokenManager};
use crate::client::{DEFAULT_API_BASE, RiseClient, validate_brightness};
use crate::error::Error;
use crate::models::{GardenSummary, RawDeviceState};
use crate::transport::TransportConfig;

/// Endpoints and tuning for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_base: String,
    pub auth_url: String,
    pub transport: TransportConfig,
    /// Tokens are refreshed this long before they expire.
    pub token_margin: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            auth_url: DEFAULT_AUTH_URL.into(),
            transport: TransportConfig::default(),
            token_margin: DEFAULT_TOKEN_MARGIN,
        }
    }
}

/// An account session against the Rise cloud.
///
/// Owns one HTTP connection pool shared by the identity provider and the
/// garden endpoints. Cheap to share behind an `Arc`.
pub struct Session {
    client: RiseClient,
    tokens: TokenManager,
}

impl Session {
    pub fn new(config: &SessionConfig, credentials: Credentials) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        let client = RiseClient::with_client(http.clone(), &config.api_base)?;
        let token_url = Url::parse(&config.auth_url)?;
        let tokens = TokenManager::new(http, token_url, credentials, config.token_margin);
        Ok(Self { client, tokens })
    }

    pub fn client(&self) -> &RiseClient {
        &self.client
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Run `op` with a valid token, retrying once with a fresh token if
    /// the API rejects the first one.
    async fn authorized<T, F, Fut>(&self, op: F) -> Result<T, Error>
    where
        F: Fn(Token) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let token = self.tokens.get_valid_token().await?;
        match op(token.clone()).await {
            Err(Error::TokenExpired) => {
                debug!("access token rejected by API, re-authenticating once");
                self.tokens.invalidate(&token).await;
                let fresh = self.tokens.get_valid_token().await?;
                match op(fresh).await {
                    Err(Error::TokenExpired) => Err(Error::Authentication {
                        message: "API rejected a freshly issued access token".into(),
                    }),
                    other => other,
                }
            }
            other => other,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn list_gardens(&self) -> Result<Vec<GardenSummary>, Error> {
        self.authorized(|token| async move { self.client.list_gardens(&token).await })
            .await
    }

    pub async fn garden_detail(&self, garden_id: u64) -> Result<RawDeviceState, Error> {
        self.authorized(|token| async move { self.client.get_garden_detail(&token, garden_id).await })
            .await
    }

    pub async fn light_schedule(&self, garden_id: u64) -> Result<serde_json::Value, Error> {
        self.authorized(|token| async move { self.client.light_schedule(&token, garden_id).await })
            .await
    }

    pub async fn pump_schedule(&self, garden_id: u64) -> Result<serde_json::Value, Error> {
        self.authorized(|token| async move { self.client.pump_schedule(&token, garden_id).await })
            .await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch the grow light. The brightness is checked before a token is
    /// requested, so an invalid value costs no network traffic at all.
    pub async fn set_light(&self, garden_id: u64, on: bool, brightness: i32) -> Result<(), Error> {
        validate_brightness(brightness)?;
        self.authorized(|token| async move {
            self.client
                .set_light(&token, garden_id, on, brightness)
                .await
        })
        .await
    }

    pub async fn set_pump(&self, garden_id: u64, on: bool) -> Result<(), Error> {
        self.authorized(|token| async move { self.client.set_pump(&token, garden_id, on).await })
            .await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Authenticate and list the account's gardens. Used to check
    /// credentials interactively.
    pub async fn verify(&self) -> Result<Vec<GardenSummary>, Error> {
        self.tokens.get_valid_token().await?;
        self.list_gardens().await
    }

    /// Forget the cached token.
    pub async fn close(&self) {
        self.tokens.clear().await;
    }
}
