// Rise API response types
//
// The vendor payloads are not contractually stable: fields come and go
// between firmware releases and the same value is sometimes a number and
// sometimes a string. Every telemetry field is therefore optional and
// decoded through the `lenient` helpers, so one odd field never takes the
// whole payload down with it.

use serde::{Deserialize, Serialize};

// ── Identity provider ────────────────────────────────────────────────

/// Password-realm grant request sent to the identity provider.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrantRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub realm: &'a str,
    pub scope: &'a str,
    pub client_id: &'a str,
    pub grant_type: &'a str,
}

/// Successful token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds. Absent on some tenants; see
    /// [`DEFAULT_TOKEN_LIFETIME_SECS`](crate::auth::DEFAULT_TOKEN_LIFETIME_SECS).
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ── Gardens ──────────────────────────────────────────────────────────

/// Envelope of `GET /gardens/list_v2`.
///
/// Entries are kept as raw JSON so that one malformed garden can be
/// skipped without discarding its siblings.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GardenListEnvelope {
    #[serde(default)]
    pub gardens: Vec<serde_json::Value>,
}

/// One entry of the garden listing.
///
/// Besides identity and connectivity, the listing carries a subset of the
/// telemetry (light level, water LED index, task counters), captured in
/// [`state`](Self::state).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GardenSummary {
    #[serde(deserialize_with = "lenient::id")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub state: RawDeviceState,
}

/// Raw per-device telemetry, from either the listing or the detail endpoint.
///
/// Every field is "no information" when `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDeviceState {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_online: Option<bool>,

    /// Light level 0-100 as reported by the listing.
    #[serde(default, deserialize_with = "lenient::number")]
    pub light_level: Option<f64>,
    /// Light level 0-100 as reported by the sensor endpoint.
    #[serde(default, deserialize_with = "lenient::number")]
    pub l1: Option<f64>,

    /// Explicit water level percentage, when the device reports one.
    #[serde(default, deserialize_with = "lenient::number")]
    pub water_level: Option<f64>,
    /// Reservoir LED gauge, 0 (empty) to 5 (full).
    #[serde(default, deserialize_with = "lenient::number")]
    pub water_led_index: Option<f64>,
    /// Water depth in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub water_depth: Option<f64>,
    /// Distance from the sensor to the water surface in millimetres.
    #[serde(default, deserialize_with = "lenient::number")]
    pub water_distance: Option<f64>,

    /// Ambient temperature in degrees Celsius.
    #[serde(default, deserialize_with = "lenient::number")]
    pub at: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub number_of_tasks: Option<f64>,
    #[serde(default, deserialize_with = "lenient::tasks")]
    pub user_tasks: Option<UserTasks>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_care_needed: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub next_care_at: Option<String>,

    /// Water pump running.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub wp: Option<bool>,
    /// Seed kit identifier.
    #[serde(default, deserialize_with = "lenient::text")]
    pub kit: Option<String>,
}

impl RawDeviceState {
    /// Overlay `other` on top of `self`: fields present in `other` win,
    /// absent ones fall through to `self`.
    ///
    /// `light_level`/`l1` and `water_level`/`water_led_index` are two
    /// encodings of one reading each and are taken as a pair: if `other`
    /// carries either, both come from `other`.
    #[must_use]
    pub fn overlay(self, other: RawDeviceState) -> RawDeviceState {
        let (light_level, l1) = paired((self.light_level, self.l1), (other.light_level, other.l1));
        let (water_level, water_led_index) = paired(
            (self.water_level, self.water_led_index),
            (other.water_level, other.water_led_index),
        );
        RawDeviceState {
            is_online: other.is_online.or(self.is_online),
            light_level,
            l1,
            water_level,
            water_led_index,
            water_depth: other.water_depth.or(self.water_depth),
            water_distance: other.water_distance.or(self.water_distance),
            at: other.at.or(self.at),
            number_of_tasks: other.number_of_tasks.or(self.number_of_tasks),
            user_tasks: other.user_tasks.or(self.user_tasks),
            is_care_needed: other.is_care_needed.or(self.is_care_needed),
            next_care_at: other.next_care_at.or(self.next_care_at),
            wp: other.wp.or(self.wp),
            kit: other.kit.or(self.kit),
        }
    }
}

type Pair<T> = (Option<T>, Option<T>);

fn paired<T>(base: Pair<T>, top: Pair<T>) -> Pair<T> {
    if top.0.is_some() || top.1.is_some() {
        top
    } else {
        base
    }
}

/// `user_tasks` block of the listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserTasks {
    #[serde(default)]
    pub major_task: Vec<TaskEntry>,
    #[serde(default)]
    pub minor_task: Vec<TaskEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskEntry {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct LightLevelRequest {
    pub light_level: u8,
}

#[derive(Debug, Serialize)]
pub(crate) struct PumpRequest {
    pub pump: bool,
}

// ── Field-level decoding ─────────────────────────────────────────────

/// Tolerant field decoders: a value of the wrong shape decodes as `None`
/// instead of failing the surrounding struct.
pub(crate) mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::UserTasks;

    fn raw<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
        Option::<Value>::deserialize(d)
    }

    pub(crate) fn as_number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|f| f.is_finite())
    }

    pub(crate) fn as_flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => Some(true),
                "false" | "off" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(raw(d)?.as_ref().and_then(as_number))
    }

    pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(raw(d)?.as_ref().and_then(as_flag))
    }

    pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match raw(d)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub(crate) fn tasks<'de, D: Deserializer<'de>>(d: D) -> Result<Option<UserTasks>, D::Error> {
        Ok(raw(d)?.and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Garden ids are integers, occasionally serialized as strings.
    pub(crate) fn id<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(d)?;
        match &value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| D::Error::custom(format!("invalid garden id: {value}")))
    }
}
