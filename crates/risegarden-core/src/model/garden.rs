// ── Garden ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Brightness a garden starts with before any light level was observed.
pub const DEFAULT_BRIGHTNESS: u8 = 100;

/// Vendor-assigned garden identifier. Stable for the lifetime of the garden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GardenId(pub u64);

impl GardenId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GardenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for GardenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Grow light state.
///
/// `brightness` is the last level the light was seen at; it is kept while
/// the light is off so that switching back on restores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub is_on: bool,
    /// 1-100 once observed; [`DEFAULT_BRIGHTNESS`] until then.
    pub brightness: u8,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            is_on: false,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

/// Reservoir readings. Each value may be independently absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WaterState {
    /// Fill level 0-100.
    pub level_percent: Option<u8>,
    /// Water depth in millimetres, never negative.
    pub depth_mm: Option<f64>,
    /// Sensor-to-surface distance in millimetres.
    pub distance_mm: Option<f64>,
}

/// Care tasks the vendor app currently shows for a garden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub major: Vec<String>,
    pub minor: Vec<String>,
    pub care_needed: Option<bool>,
    pub next_care_at: Option<String>,
}

/// One garden as last observed.
///
/// Created on the first successful fetch and merged in place afterwards.
/// A field missing from a later payload keeps its previous value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Garden {
    pub id: GardenId,
    pub name: String,
    pub online: bool,
    pub light: LightState,
    pub water: WaterState,
    pub temperature_c: Option<f64>,
    pub pending_task_count: u32,
    pub tasks: TaskSummary,
    pub pump_running: Option<bool>,
    pub kit_id: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Garden {
    pub fn new(id: GardenId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            online: false,
            light: LightState::default(),
            water: WaterState::default(),
            temperature_c: None,
            pending_task_count: 0,
            tasks: TaskSummary::default(),
            pump_running: None,
            kit_id: None,
            last_updated: None,
        }
    }

    /// Current brightness on the host's 0-255 scale (0 while off).
    ///
    /// `floor(level * 2.55)`, computed in integers so 100 maps to 255.
    pub fn brightness_255(&self) -> u8 {
        if !self.light.is_on {
            return 0;
        }
        let scaled = u16::from(self.light.brightness.min(100)) * 255 / 100;
        u8::try_from(scaled).unwrap_or(u8::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_255_scales_level() {
        let mut garden = Garden::new(GardenId(1), "Kitchen");
        garden.light = LightState {
            is_on: true,
            brightness: 100,
        };
        assert_eq!(garden.brightness_255(), 255);

        garden.light.brightness = 50;
        assert_eq!(garden.brightness_255(), 127);

        garden.light.is_on = false;
        assert_eq!(garden.brightness_255(), 0);
    }
}
