//! Value coalescer - absolute motion collapsed to the latest desired value
//!
//! Targets arriving faster than the controller can take them are collapsed:
//! only the newest desired value is ever handed to the executor. A handoff
//! rejected because the executor is busy is retried on every tick with the
//! then-current value until the controller's feedback matches it.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::config::DispatchConfig;
use super::executor::Handoff;
use super::intake::{latest, offer};
use super::shutdown::{ShutdownHandle, ShutdownListener, shutdown_pair};
use crate::controller::{Controller, Target};

/// Point-in-time view of a value coalescer's loop state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlideSnapshot {
    /// Last value reported by the controller
    pub active: i64,
    /// Last value the user asked for
    pub selected: i64,
    /// A handoff was rejected and waits for the next tick
    pub pending: bool,
    /// Values accepted by the executor
    pub handoffs: u64,
    /// Handoff attempts rejected because the executor was busy
    pub deferred: u64,
}

#[derive(Debug, Default)]
struct SlideState {
    active: i64,
    selected: i64,
    pending: bool,
    handoffs: u64,
    deferred: u64,
}

impl SlideState {
    /// Returns true when the new target needs a handoff
    fn on_target(&mut self, value: i64) -> bool {
        self.selected = value;
        self.active != self.selected
    }

    fn on_active(&mut self, value: i64) {
        self.active = value;
        // Idle feedback must not look like a user change
        if !self.pending {
            self.selected = value;
        }
    }

    /// Returns true when this tick needs a handoff
    fn on_tick(&mut self) -> bool {
        if self.active == self.selected {
            self.pending = false;
            return false;
        }
        true
    }

    fn handed_off(&mut self, accepted: bool) {
        self.pending = !accepted;
        if accepted {
            self.handoffs += 1;
        } else {
            self.deferred += 1;
        }
    }

    fn snapshot(&self) -> SlideSnapshot {
        SlideSnapshot {
            active: self.active,
            selected: self.selected,
            pending: self.pending,
            handoffs: self.handoffs,
            deferred: self.deferred,
        }
    }
}

/// Handle to a running value coalescer
///
/// All reporting methods are non-blocking. Dropping the handle stops the
/// loop as well; use [`ValueCoalescer::close`] to wait for it.
pub struct ValueCoalescer {
    target: Target,
    targets_tx: mpsc::Sender<i64>,
    active_tx: mpsc::Sender<i64>,
    query_tx: mpsc::Sender<oneshot::Sender<SlideSnapshot>>,
    shutdown: ShutdownHandle,
}

impl ValueCoalescer {
    /// Spawn the coalescer loop and its executor for one control bound to `target`
    pub fn spawn(target: Target, controller: Arc<dyn Controller>, config: &DispatchConfig) -> Self {
        debug!(control = %target, ?config, "ValueCoalescer::spawn: called");
        let (targets_tx, targets_rx) = mpsc::channel(config.intake_buffer);
        let (active_tx, active_rx) = mpsc::channel(config.intake_buffer);
        let (query_tx, query_rx) = mpsc::channel(8);
        let (shutdown, listener) = shutdown_pair();

        let handoff = Handoff::spawn(target, controller);
        let coalescer = SlideLoop {
            target,
            tick: config.tick(),
            handoff,
            state: SlideState::default(),
        };
        tokio::spawn(coalescer.run(targets_rx, active_rx, query_rx, listener));

        Self {
            target,
            targets_tx,
            active_tx,
            query_tx,
            shutdown,
        }
    }

    /// The controller target this coalescer drives
    pub fn target(&self) -> Target {
        self.target
    }

    /// Report the value the user wants to reach
    pub fn report_target(&self, value: i64) {
        offer(&self.targets_tx, value, self.target, "target");
    }

    /// Report the controller's current absolute value
    pub fn report_active(&self, value: i64) {
        offer(&self.active_tx, value, self.target, "active");
    }

    /// Read the loop state once all events queued so far are processed
    pub async fn snapshot(&self) -> Result<SlideSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.query_tx
            .send(reply_tx)
            .await
            .map_err(|_| eyre!("Value coalescer closed"))?;
        reply_rx.await.map_err(|_| eyre!("Value coalescer closed before reply"))
    }

    /// Stop intake, wait for the loop and its executor to exit; idempotent
    pub async fn close(&self) {
        debug!(control = %self.target, "ValueCoalescer::close: called");
        self.shutdown.close().await;
    }

    /// Whether the loop has exited
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }
}

struct SlideLoop {
    target: Target,
    tick: Duration,
    handoff: Handoff,
    state: SlideState,
}

impl SlideLoop {
    async fn run(
        mut self,
        mut targets_rx: mpsc::Receiver<i64>,
        mut active_rx: mpsc::Receiver<i64>,
        mut query_rx: mpsc::Receiver<oneshot::Sender<SlideSnapshot>>,
        mut shutdown: ShutdownListener,
    ) {
        info!(control = %self.target, "Value coalescer started");

        // Delay the first tick by one interval (interval() ticks immediately)
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.requested() => {
                    debug!(control = %self.target, "Shutdown requested");
                    break;
                }

                _ = ticker.tick() => {
                    if self.state.on_tick() {
                        self.try_dispatch();
                    }
                }

                target = targets_rx.recv() => match target {
                    Some(value) => {
                        let value = latest(&mut targets_rx, value);
                        if self.state.on_target(value) {
                            self.try_dispatch();
                        }
                    }
                    None => {
                        debug!(control = %self.target, "All handles dropped");
                        break;
                    }
                },

                Some(value) = active_rx.recv() => {
                    self.state.on_active(value);
                }

                Some(reply_tx) = query_rx.recv() => {
                    let _ = reply_tx.send(self.state.snapshot());
                }
            }
        }

        targets_rx.close();
        active_rx.close();
        while let Ok(value) = targets_rx.try_recv() {
            self.state.selected = value;
        }
        while let Ok(value) = active_rx.try_recv() {
            self.state.on_active(value);
        }

        let Self { target, handoff, state, .. } = self;
        handoff.shutdown().await;

        info!(
            control = %target,
            handoffs = state.handoffs,
            abandoned = state.active != state.selected,
            "Value coalescer stopped"
        );
    }

    fn try_dispatch(&mut self) {
        let value = self.state.selected;
        let accepted = self.handoff.try_handoff(value);
        self.state.handed_off(accepted);
    }
}
