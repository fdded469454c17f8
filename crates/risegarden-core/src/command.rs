// ── Command API ──
//
// All write operations flow through the `Command` enum. The coordinator
// sends each one straight to the vendor API; none of them waits for a
// refresh cycle, and a successful command schedules one.

use crate::model::GardenId;

/// Light command in vendor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCommand {
    pub on: bool,
    /// Vendor light level, 0-100.
    pub level: u8,
}

impl LightCommand {
    /// Switch on at a host brightness (0-255), or full brightness when
    /// none is given.
    ///
    /// The level is `floor(b / 2.55)` clamped to 1-100: a turn-on command
    /// never switches the light off.
    pub fn turn_on(brightness_255: Option<u8>) -> Self {
        let level = brightness_255.map_or(100, |b| {
            let scaled = u16::from(b) * 100 / 255;
            u8::try_from(scaled).unwrap_or(100).clamp(1, 100)
        });
        Self { on: true, level }
    }

    pub fn turn_off() -> Self {
        Self { on: false, level: 0 }
    }

    /// Switch on at an explicit vendor level (0-100, validated on send).
    pub fn level(level: u8) -> Self {
        Self { on: true, level }
    }
}

/// All write operations against a garden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetLight { garden: GardenId, light: LightCommand },
    SetPump { garden: GardenId, on: bool },
    /// Run a refresh cycle now and wait for it.
    Refresh,
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// Revision published by the refresh the command ran.
    Refreshed { revision: u64 },
}
