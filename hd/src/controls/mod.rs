//! Surface controls bound to controller targets
//!
//! Buttons call straight through to the controller. The VFO wheel and the
//! volume fader sit on top of the coalescers in [`crate::dispatch`].

mod button;
mod config;
mod key;
mod vfo;
mod volume;

pub use button::{MuteButton, RxChannelEnableButton, SplitEnableButton};
pub use config::{VolumeConfig, WheelConfig};
pub use key::{FeedbackSink, Led, MidiKey};
pub use vfo::VfoWheel;
pub use volume::VolumeSlider;
