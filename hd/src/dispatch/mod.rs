//! Event-coalescing dispatch
//!
//! Each coalescer owns its state inside one tokio task that multiplexes two
//! intake queues and a fixed tick. Producers never block; the controller sees
//! at most one command per tick carrying the newest desired value.
//!
//! - **Turn accumulator:** relative motion (rotary encoders)
//! - **Value coalescer:** absolute motion (sliders), with a separate executor
//!   so a slow controller call never stalls the decision loop

mod config;
mod executor;
mod intake;
mod shutdown;
mod slider;
mod wheel;

pub use config::DispatchConfig;
pub use slider::{SlideSnapshot, ValueCoalescer};
pub use wheel::{TurnAccumulator, TurnSnapshot, scale_turns};
