// Identity provider token management
//
// Password-realm grant against the vendor's Auth0 tenant. The manager
// caches one access token, refreshes it `margin` before expiry, and
// serializes refreshes so concurrent callers share a single exchange.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, preview};
use crate::models::{PasswordGrantRequest, TokenResponse};

/// Token endpoint of the vendor's identity provider.
pub const DEFAULT_AUTH_URL: &str = "https://rise-api-prod.auth0.com/oauth/token";
/// Client id of the vendor's mobile app.
pub const CLIENT_ID: &str = "emZRRctislhPO5ghhbWsJi5DNbvl4yUt";
pub const REALM: &str = "Username-Password-Authentication";
pub const GRANT_TYPE: &str = "http://auth0.com/oauth/grant-type/password-realm";
pub const SCOPE: &str = "openid profile email offline_access";
/// Base64 of `{"name":"react-native-auth0","version":"2.11.0"}`.
const AUTH0_CLIENT: &str = "eyJuYW1lIjoicmVhY3QtbmF0aXZlLWF1dGgwIiwidmVyc2lvbiI6IjIuMTEuMCJ9";

/// Tokens are treated as expired this long before their literal expiry.
pub const DEFAULT_TOKEN_MARGIN: Duration = Duration::from_secs(60);
/// Lifetime assumed when the identity provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
/// Longer advertised lifetimes are clamped to this.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Account credentials. Held in memory only; the password never reaches
/// a log line.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// A bearer token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct Token {
    access_token: SecretString,
    expires_at: Instant,
}

impl Token {
    /// Build a token that expires `lifetime` from now, clamped to
    /// [`MAX_TOKEN_LIFETIME`].
    pub fn new(access_token: impl Into<String>, lifetime: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(lifetime.min(MAX_TOKEN_LIFETIME))
            .unwrap_or(now);
        Self::expiring_at(access_token, expires_at)
    }

    pub fn expiring_at(access_token: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expires_at,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Valid iff `now < expires_at - margin`.
    pub fn is_valid_at(&self, now: Instant, margin: Duration) -> bool {
        now.checked_add(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }

    pub(crate) fn bearer(&self) -> &str {
        self.access_token.expose_secret()
    }

    fn same_as(&self, other: &Token) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
    }
}

#[derive(Debug, Default)]
struct TokenSlot {
    token: Option<Token>,
    /// Set once the identity provider rejected the credentials. Further
    /// exchanges with the same credentials are refused locally.
    rejected: Option<String>,
}

/// Obtains, caches and refreshes access tokens.
///
/// The slot lock is held across the exchange: callers arriving while a
/// refresh is in flight queue on the lock and find the fresh token when
/// they get it, so N concurrent callers cost one exchange.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
    margin: Duration,
    slot: Mutex<TokenSlot>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        token_url: Url,
        credentials: Credentials,
        margin: Duration,
    ) -> Self {
        Self {
            http,
            token_url,
            credentials,
            margin,
            slot: Mutex::new(TokenSlot::default()),
        }
    }

    /// The account this manager authenticates.
    pub fn email(&self) -> &str {
        &self.credentials.email
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    /// Return a token that is valid for at least `margin`, minting a new
    /// one if needed.
    ///
    /// Fails with [`Error::Authentication`] when the identity provider
    /// rejects the credentials; that failure is sticky for this manager.
    /// Provider outages (5xx, 429) and transport errors are returned as
    /// is and the next call tries again.
    pub async fn get_valid_token(&self) -> Result<Token, Error> {
        let mut slot = self.slot.lock().await;

        if let Some(reason) = &slot.rejected {
            return Err(Error::Authentication {
                message: reason.clone(),
            });
        }

        if let Some(token) = &slot.token {
            if token.is_valid_at(Instant::now(), self.margin) {
                return Ok(token.clone());
            }
            debug!("access token within refresh margin, re-authenticating");
        }

        slot.token = None;
        match self.exchange().await {
            Ok(token) => {
                slot.token = Some(token.clone());
                Ok(token)
            }
            Err(Error::Authentication { message }) => {
                warn!(email = %self.credentials.email, "credentials rejected by identity provider");
                slot.rejected = Some(message.clone());
                Err(Error::Authentication { message })
            }
            Err(e) => Err(e),
        }
    }

    /// Discard `rejected` if it is still the cached token. A newer token
    /// minted by another caller is left alone.
    pub async fn invalidate(&self, rejected: &Token) {
        let mut slot = self.slot.lock().await;
        if slot.token.as_ref().is_some_and(|t| t.same_as(rejected)) {
            debug!("discarding rejected access token");
            slot.token = None;
        }
    }

    /// Drop the cached token (session teardown).
    pub async fn clear(&self) {
        self.slot.lock().await.token = None;
    }

    async fn exchange(&self) -> Result<Token, Error> {
        debug!(url = %self.token_url, "requesting access token");

        let body = PasswordGrantRequest {
            username: &self.credentials.email,
            password: self.credentials.password.expose_secret(),
            realm: REALM,
            scope: SCOPE,
            client_id: CLIENT_ID,
            grant_type: GRANT_TYPE,
        };

        let resp = self
            .http
            .post(self.token_url.clone())
            .header("auth0-client", AUTH0_CLIENT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!(
                    "identity provider refused token exchange (HTTP {status}): {}",
                    preview(&body)
                ),
            });
        }

        let body = resp.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("token response: {e}"),
                body: String::new(),
            })?;

        let advertised = parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let lifetime = Duration::from_secs(advertised).min(MAX_TOKEN_LIFETIME);
        if lifetime.as_secs() < advertised {
            warn!(
                expires_in_secs = advertised,
                "token lifetime out of range, clamping"
            );
        }
        info!(
            expires_in_secs = lifetime.as_secs(),
            "authenticated with Rise identity provider"
        );

        Ok(Token::new(parsed.access_token, lifetime))
    }
}
