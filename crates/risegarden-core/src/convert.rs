// ── API-to-domain normalization ──
//
// Folds raw `risegarden_api` telemetry into `Garden`. The update is a
// pure partial merge: a field absent from the payload keeps its previous
// value, out-of-range numbers are clamped instead of rejected, and
// applying the same payload twice is the same as applying it once.

use chrono::{DateTime, Utc};

use risegarden_api::RawDeviceState;

use crate::model::Garden;

// ── Helpers ────────────────────────────────────────────────────────

/// Clamp to 0-100 and round to the nearest whole percent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Clamp to a non-negative count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn count(value: f64) -> u32 {
    value.clamp(0.0, f64::from(u32::MAX)).floor() as u32
}

fn non_negative(value: f64) -> f64 {
    value.max(0.0)
}

fn titles(entries: &[risegarden_api::TaskEntry]) -> Vec<String> {
    entries.iter().filter_map(|t| t.title.clone()).collect()
}

// ── Garden ─────────────────────────────────────────────────────────

/// Water percentage: the explicit level when reported, otherwise the LED
/// gauge (0-5) scaled by 20.
fn water_level(raw: &RawDeviceState) -> Option<u8> {
    raw.water_level
        .or_else(|| raw.water_led_index.map(|index| index * 20.0))
        .map(percent)
}

/// Light level from the listing field, falling back to the sensor field.
fn light_level(raw: &RawDeviceState) -> Option<u8> {
    raw.light_level.or(raw.l1).map(percent)
}

impl Garden {
    /// Merge one cycle's combined payload into this garden.
    ///
    /// Connectivity is the exception to "absent keeps previous": a cycle
    /// whose combined payload says nothing about `is_online` marks the
    /// garden offline.
    pub fn apply(&mut self, raw: &RawDeviceState, observed_at: DateTime<Utc>) {
        self.online = raw.is_online.unwrap_or(false);

        if let Some(level) = light_level(raw) {
            self.light.is_on = level > 0;
            if level > 0 {
                self.light.brightness = level;
            }
        }

        if let Some(level) = water_level(raw) {
            self.water.level_percent = Some(level);
        }
        if let Some(depth) = raw.water_depth {
            self.water.depth_mm = Some(non_negative(depth));
        }
        if let Some(distance) = raw.water_distance {
            self.water.distance_mm = Some(non_negative(distance));
        }

        if let Some(temp) = raw.at {
            self.temperature_c = Some(temp);
        }

        if let Some(tasks) = &raw.user_tasks {
            self.tasks.major = titles(&tasks.major_task);
            self.tasks.minor = titles(&tasks.minor_task);
        }
        match (raw.number_of_tasks, &raw.user_tasks) {
            (Some(n), _) => self.pending_task_count = count(n),
            (None, Some(tasks)) => {
                self.pending_task_count =
                    u32::try_from(tasks.major_task.len() + tasks.minor_task.len())
                        .unwrap_or(u32::MAX);
            }
            (None, None) => {}
        }
        if let Some(flag) = raw.is_care_needed {
            self.tasks.care_needed = Some(flag);
        }
        if let Some(next) = &raw.next_care_at {
            self.tasks.next_care_at = Some(next.clone());
        }

        if let Some(running) = raw.wp {
            self.pump_running = Some(running);
        }
        if let Some(kit) = &raw.kit {
            self.kit_id = Some(kit.clone());
        }

        self.last_updated = Some(observed_at);
    }
}

// ── Tests ──────────────────────────────────────────────────────────
