//! HamDeck - MIDI control surface bridge
//!
//! HamDeck maps control-surface events to commands on a remote transceiver
//! controller and mirrors the controller's state back to indicator lights.
//! Bursty surface input is coalesced so the controller receives at most one
//! command per tick, always carrying the newest desired value.
//!
//! # Modules
//!
//! - [`dispatch`] - Turn accumulator, value coalescer and command executor
//! - [`controller`] - The controller contract consumed by every control
//! - [`controls`] - Buttons, VFO wheel and volume fader
//! - [`simulator`] - In-process controller and script runner
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod controller;
pub mod controls;
pub mod dispatch;
pub mod simulator;

// Re-export commonly used types
pub use config::Config;
pub use controller::{ControlError, Controller, Target, Vfo};
pub use controls::{
    FeedbackSink, Led, MidiKey, MuteButton, RxChannelEnableButton, SplitEnableButton, VfoWheel, VolumeConfig,
    VolumeSlider, WheelConfig,
};
pub use dispatch::{DispatchConfig, SlideSnapshot, TurnAccumulator, TurnSnapshot, ValueCoalescer, scale_turns};
pub use simulator::{ScriptCommand, SimulatedController, SimulationSummary, SimulatorConfig, Surface, run_script};
