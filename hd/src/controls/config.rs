//! Control configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rotary encoder tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WheelConfig {
    /// Controller units (Hz) per encoder step
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

fn default_sensitivity() -> f64 {
    debug!("default_sensitivity: called");
    1.8
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self { sensitivity: 1.8 }
    }
}

/// Fader range and its mapping to dB
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VolumeConfig {
    /// dB at the bottom of the fader
    #[serde(default = "default_min_db")]
    pub min_db: i64,

    /// dB at the top of the fader
    #[serde(default = "default_max_db")]
    pub max_db: i64,

    /// Highest raw value the fader sends
    #[serde(default = "default_input_max")]
    pub input_max: i64,
}

fn default_min_db() -> i64 {
    -60
}

fn default_max_db() -> i64 {
    0
}

fn default_input_max() -> i64 {
    127
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min_db: -60,
            max_db: 0,
            input_max: 127,
        }
    }
}

impl VolumeConfig {
    /// Translate a raw fader value to dB, truncating toward zero
    ///
    /// Raw input outside `0..=input_max` is clamped.
    pub fn translate(&self, raw: i64) -> i64 {
        let raw = raw.clamp(0, self.input_max);
        self.min_db + raw * (self.max_db - self.min_db) / self.input_max
    }
}
