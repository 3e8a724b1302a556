use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;

use ricochet_shared::combat::defaults;

pub const SETTINGS_PATH: &str = "ricochet.ron";

/// Tunable simulation knobs, loadable from a RON file next to the binary.
/// Missing or unparsable files fall back to defaults.
#[derive(Resource, Deserialize, Serialize, Debug, Clone)]
pub struct SimSettings {
    /// Outbound snapshot throttle interval.
    pub sync_interval_secs: f32,
    /// Ping cadence for RTT measurement.
    pub ping_interval_secs: f32,
    /// Exponential blend factor applied to remote position/rotation each tick.
    pub position_blend: f32,
    /// Exponential blend factor for remote vertical aim.
    pub aim_blend: f32,
    /// Delay between local death and the automatic rebirth request.
    pub respawn_countdown_secs: f32,
}

impl SimSettings {
    pub fn load() -> Self {
        match fs::read_to_string(SETTINGS_PATH) {
            Ok(content) => match ron::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from '{SETTINGS_PATH}'");
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse '{SETTINGS_PATH}', using defaults: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            sync_interval_secs: 0.05,
            ping_interval_secs: 1.0,
            position_blend: 0.2,
            aim_blend: 0.15,
            respawn_countdown_secs: defaults::RESPAWN_COUNTDOWN_SECS,
        }
    }
}
