//! Controller error types

use thiserror::Error;

use super::Target;

/// Errors a controller can report for a single command
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Controller rejected {target} = {value}: {reason}")]
    Rejected { target: Target, value: i64, reason: String },

    #[error("Controller disconnected")]
    Disconnected,
}
