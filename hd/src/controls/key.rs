//! Surface keys, indicator lights and feedback routing

use std::fmt;

use crate::controller::Target;

/// A key (button, encoder or fader) on the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiKey {
    pub channel: u8,
    pub key: u8,
}

impl MidiKey {
    pub fn new(channel: u8, key: u8) -> Self {
        Self { channel, key }
    }
}

impl fmt::Display for MidiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.key)
    }
}

/// Indicator light plumbing of the surface
pub trait Led: Send + Sync {
    fn set(&self, key: MidiKey, on: bool);
}

/// Receives the controller's authoritative state changes
///
/// Every control filters by target identity; reports for other targets are
/// discarded before they reach any coalescer.
pub trait FeedbackSink: Send + Sync {
    fn feedback(&self, target: Target, value: i64);
}
