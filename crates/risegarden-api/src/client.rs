// Hand-crafted async HTTP client for the Rise Gardens garden API.
//
// Base path: /v2/
// Auth: bearer token from the identity provider (see `auth`)

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Token;
use crate::error::{Error, preview};
use crate::models::{
    GardenListEnvelope, GardenSummary, LightLevelRequest, PumpRequest, RawDeviceState,
};
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_API_BASE: &str = "https://prod-api.risegds.com/v2/";

/// Highest light level the vendor accepts.
pub const MAX_BRIGHTNESS: i32 = 100;

/// Check a requested light level against the vendor's 0-100 range.
pub fn validate_brightness(brightness: i32) -> Result<u8, Error> {
    if (0..=MAX_BRIGHTNESS).contains(&brightness) {
        u8::try_from(brightness).map_err(|_| Error::invalid_argument("brightness out of range"))
    } else {
        Err(Error::invalid_argument(format!(
            "brightness must be within 0..={MAX_BRIGHTNESS}, got {brightness}"
        )))
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the garden endpoints.
///
/// Stateless apart from the connection pool: every call takes the bearer
/// token explicitly and nothing is cached here.
pub struct RiseClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RiseClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API root and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Gardens ──────────────────────────────────────────────────────

    /// List every garden on the account.
    ///
    /// `GET /gardens/list_v2`. Entries that cannot be decoded (no usable
    /// id) are skipped with a warning.
    pub async fn list_gardens(&self, token: &Token) -> Result<Vec<GardenSummary>, Error> {
        let envelope: GardenListEnvelope = self.get(token, "gardens/list_v2", &[]).await?;

        let gardens = envelope
            .gardens
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<GardenSummary>(raw) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable garden entry");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = gardens.len(), "listed gardens");
        Ok(gardens)
    }

    /// Latest sensor telemetry for one garden.
    ///
    /// `GET /device/last_data_sensors?garden_id={id}`. The payload is either
    /// the telemetry object itself or an object keyed by the garden id.
    pub async fn get_garden_detail(
        &self,
        token: &Token,
        garden_id: u64,
    ) -> Result<RawDeviceState, Error> {
        let mut body: serde_json::Value = self
            .get(
                token,
                "device/last_data_sensors",
                &[("garden_id", garden_id.to_string())],
            )
            .await?;

        let key = garden_id.to_string();
        let payload = match body.get_mut(&key) {
            Some(inner) if inner.is_object() => inner.take(),
            _ => body,
        };

        if !payload.is_object() {
            return Err(Error::Deserialization {
                message: format!("garden {garden_id}: expected a JSON object"),
                body: payload.to_string(),
            });
        }

        serde_json::from_value(payload).map_err(|e| Error::Deserialization {
            message: format!("garden {garden_id}: {e}"),
            body: String::new(),
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch the grow light.
    ///
    /// `PUT /gardens/{id}/device/light-level` with `{"light_level": n}`.
    /// `on = false` sends level 0; the brightness is validated either way
    /// and an out-of-range value fails before any request is made.
    pub async fn set_light(
        &self,
        token: &Token,
        garden_id: u64,
        on: bool,
        brightness: i32,
    ) -> Result<(), Error> {
        let level = validate_brightness(brightness)?;
        let light_level = if on { level } else { 0 };
        debug!(garden_id, light_level, "setting light level");

        self.put_no_response(
            token,
            &format!("gardens/{garden_id}/device/light-level"),
            &LightLevelRequest { light_level },
        )
        .await
    }

    /// Start or stop the water pump.
    ///
    /// `POST /gardens/{id}/device/pump` with `{"pump": bool}`.
    pub async fn set_pump(&self, token: &Token, garden_id: u64, on: bool) -> Result<(), Error> {
        debug!(garden_id, on, "setting pump");
        self.post_no_response(
            token,
            &format!("gardens/{garden_id}/device/pump"),
            &PumpRequest { pump: on },
        )
        .await
    }

    // ── Schedules ────────────────────────────────────────────────────

    /// `GET /device/light-schedule?garden_id={id}`, returned verbatim.
    pub async fn light_schedule(
        &self,
        token: &Token,
        garden_id: u64,
    ) -> Result<serde_json::Value, Error> {
        self.get(
            token,
            "device/light-schedule",
            &[("garden_id", garden_id.to_string())],
        )
        .await
    }

    /// `GET /device/pump/schedule?garden_id={id}`, returned verbatim.
    pub async fn pump_schedule(
        &self,
        token: &Token,
        garden_id: u64,
    ) -> Result<serde_json::Value, Error> {
        self.get(
            token,
            "device/pump/schedule",
            &[("garden_id", garden_id.to_string())],
        )
        .await
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        token: &Token,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.bearer())
            .query(params)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync>(
        &self,
        token: &Token,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .bearer_auth(token.bearer())
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    async fn put_no_response<B: Serialize + Sync>(
        &self,
        token: &Token,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self
            .http
            .put(url)
            .bearer_auth(token.bearer())
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let resp = Self::check_status(resp).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        Self::check_status(resp).await.map(|_| ())
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::TokenExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_bounds() {
        assert_eq!(validate_brightness(0).ok(), Some(0));
        assert_eq!(validate_brightness(100).ok(), Some(100));
        assert!(matches!(
            validate_brightness(101),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            validate_brightness(-1),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = RiseClient::normalize_base_url("https://prod-api.risegds.com/v2").ok();
        assert_eq!(
            url.map(|u| u.join("gardens/list_v2").map(|j| j.to_string()).ok()),
            Some(Some("https://prod-api.risegds.com/v2/gardens/list_v2".to_owned()))
        );
    }
}
