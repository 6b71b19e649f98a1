//! Device controller contract
//!
//! The controller is consumed only through [`Controller::set_value`]; its
//! transport and protocol live outside this crate.

mod error;
mod traits;

pub use error::ControlError;
pub use traits::{Controller, Target, Vfo, flag_value};
