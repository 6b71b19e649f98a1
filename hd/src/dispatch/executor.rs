//! Command executor - performs controller calls off the decision loop
//!
//! The worker offers a single slot whenever it is idle. The decision loop
//! fills that slot without waiting; while the worker is inside a controller
//! call there is no slot and the handoff fails fast.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::{Controller, Target};

/// Decision-loop side of a capacity-1 handoff to the executor worker
pub(crate) struct Handoff {
    target: Target,
    slots: mpsc::Receiver<oneshot::Sender<i64>>,
    worker: JoinHandle<()>,
}

impl Handoff {
    /// Spawn the executor worker for `target`
    pub(crate) fn spawn(target: Target, controller: Arc<dyn Controller>) -> Self {
        debug!(control = %target, "Handoff::spawn: called");
        let (slots_tx, slots_rx) = mpsc::channel(1);
        let worker = tokio::spawn(worker_loop(target, controller, slots_tx));
        Self {
            target,
            slots: slots_rx,
            worker,
        }
    }

    /// Hand `value` to the worker if it is idle
    ///
    /// Returns false when the worker is busy (or gone); never waits.
    pub(crate) fn try_handoff(&mut self, value: i64) -> bool {
        match self.slots.try_recv() {
            Ok(slot) => {
                let accepted = slot.send(value).is_ok();
                debug!(control = %self.target, value, accepted, "Handoff::try_handoff: slot filled");
                accepted
            }
            Err(_) => {
                debug!(control = %self.target, value, "Handoff::try_handoff: executor busy");
                false
            }
        }
    }

    /// Close the handoff and wait for the worker to finish its current call
    pub(crate) async fn shutdown(self) {
        debug!(control = %self.target, "Handoff::shutdown: called");
        let Self { slots, worker, .. } = self;
        drop(slots);
        if let Err(e) = worker.await {
            warn!(error = %e, "Executor worker ended abnormally");
        }
    }
}

async fn worker_loop(target: Target, controller: Arc<dyn Controller>, slots: mpsc::Sender<oneshot::Sender<i64>>) {
    debug!(control = %target, "Executor started");
    loop {
        let (slot_tx, slot_rx) = oneshot::channel();
        if slots.send(slot_tx).await.is_err() {
            break;
        }

        // A dropped slot means the handoff was closed
        let Ok(value) = slot_rx.await else {
            break;
        };

        debug!(control = %target, value, "Executor applying value");
        if let Err(e) = controller.set_value(target, value).await {
            warn!(control = %target, value, error = %e, "Cannot apply value");
        }
    }
    debug!(control = %target, "Executor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControlError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct SlowController {
        delay: Duration,
        calls: Mutex<Vec<i64>>,
        fail: bool,
    }

    #[async_trait]
    impl Controller for SlowController {
        async fn set_value(&self, _target: Target, value: i64) -> Result<(), ControlError> {
            tokio::time::sleep(self.delay).await;
            self.calls.lock().unwrap().push(value);
            if self.fail {
                Err(ControlError::Disconnected)
            } else {
                Ok(())
            }
        }
    }

    fn slow(delay_ms: u64, fail: bool) -> Arc<SlowController> {
        Arc::new(SlowController {
            delay: Duration::from_millis(delay_ms),
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_handoff_rejected_while_busy() {
        let controller = slow(50, false);
        let mut handoff = Handoff::spawn(Target::Volume, controller.clone());

        // Let the worker offer its first slot
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handoff.try_handoff(-20));

        // Worker is inside the call now
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handoff.try_handoff(-10));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(handoff.try_handoff(-10));

        handoff.shutdown().await;
        assert_eq!(*controller.calls.lock().unwrap(), vec![-20, -10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_failures() {
        let controller = slow(0, true);
        let mut handoff = Handoff::spawn(Target::Mute, controller.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handoff.try_handoff(1));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handoff.try_handoff(0));

        handoff.shutdown().await;
        assert_eq!(*controller.calls.lock().unwrap(), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_call_in_flight() {
        let controller = slow(100, false);
        let mut handoff = Handoff::spawn(Target::Volume, controller.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handoff.try_handoff(-5));
        tokio::time::sleep(Duration::from_millis(1)).await;

        handoff.shutdown().await;
        assert_eq!(*controller.calls.lock().unwrap(), vec![-5]);
    }
}
