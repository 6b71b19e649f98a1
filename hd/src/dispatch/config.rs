//! Dispatch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Timing and buffering shared by every coalescer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    /// Tick interval in milliseconds; bounds dispatch latency
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Depth of each intake queue
    #[serde(default = "default_intake_buffer")]
    pub intake_buffer: usize,
}

fn default_tick_ms() -> u64 {
    debug!("default_tick_ms: called");
    10
}

fn default_intake_buffer() -> usize {
    debug!("default_intake_buffer: called");
    1000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        debug!("DispatchConfig::default: called");
        Self {
            tick_ms: 10,
            intake_buffer: 1000,
        }
    }
}

impl DispatchConfig {
    /// Get the tick interval as a Duration
    pub fn tick(&self) -> Duration {
        debug!(tick_ms = %self.tick_ms, "DispatchConfig::tick: called");
        Duration::from_millis(self.tick_ms)
    }
}
