//! Intake queue helpers
//!
//! Producers never block: events go through `try_send` on a deep bounded
//! queue. A full or closed queue is logged and the event is dropped.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::controller::Target;

/// Offer one event to an intake queue without blocking
pub(crate) fn offer(tx: &mpsc::Sender<i64>, value: i64, target: Target, kind: &'static str) {
    match tx.try_send(value) {
        Ok(()) => {}
        Err(TrySendError::Full(value)) => {
            warn!(control = %target, kind, value, "Intake queue full, event dropped");
        }
        Err(TrySendError::Closed(value)) => {
            debug!(control = %target, kind, value, "Intake closed, event ignored");
        }
    }
}

/// Collapse `first` and everything already queued behind it to the newest value
pub(crate) fn latest(rx: &mut mpsc::Receiver<i64>, first: i64) -> i64 {
    let mut value = first;
    let mut skipped = 0usize;
    while let Ok(next) = rx.try_recv() {
        value = next;
        skipped += 1;
    }
    if skipped > 0 {
        debug!(skipped, value, "latest: collapsed queued values");
    }
    value
}
