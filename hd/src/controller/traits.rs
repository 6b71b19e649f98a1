//! Controller trait definition

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ControlError;

/// One of the two VFOs of a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vfo {
    A,
    B,
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vfo::A => write!(f, "A"),
            Vfo::B => write!(f, "B"),
        }
    }
}

/// A value domain on the controller that a control writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Frequency in Hz of one VFO of one transceiver
    VfoFrequency { trx: u8, vfo: Vfo },
    /// Master volume in dB
    Volume,
    /// Master mute, 1 = muted
    Mute,
    /// Receive channel enable, 1 = enabled
    RxChannelEnable { trx: u8, vfo: Vfo },
    /// Split operation, 1 = enabled
    SplitEnable { trx: u8 },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::VfoFrequency { trx, vfo } => write!(f, "frequency(trx {trx}, vfo {vfo})"),
            Target::Volume => write!(f, "volume"),
            Target::Mute => write!(f, "mute"),
            Target::RxChannelEnable { trx, vfo } => write!(f, "rx-enable(trx {trx}, vfo {vfo})"),
            Target::SplitEnable { trx } => write!(f, "split(trx {trx})"),
        }
    }
}

/// Narrow command interface of the remote device controller
///
/// Calls may be slow and may fail. Callers log failures and move on; nothing
/// at this layer retries a specific failed value.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Set `target` to the absolute `value`
    async fn set_value(&self, target: Target, value: i64) -> Result<(), ControlError>;
}

/// Encode a flag for a flag target
pub fn flag_value(on: bool) -> i64 {
    if on { 1 } else { 0 }
}
