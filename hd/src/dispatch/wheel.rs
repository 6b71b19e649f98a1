//! Turn accumulator - relative motion to periodic absolute commands
//!
//! Turn deltas are summed between ticks. On each tick the sum is scaled,
//! added to the last known baseline and sent to the controller as one
//! absolute value. Baseline feedback is ignored while the control is in
//! motion so that stale feedback cannot overwrite the value being driven.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::DispatchConfig;
use super::intake::offer;
use super::shutdown::{ShutdownHandle, ShutdownListener, shutdown_pair};
use crate::controller::{Controller, Target};

/// Scale an accumulated delta to controller units, rounding half away from zero
///
/// Results beyond the i64 range saturate.
pub fn scale_turns(delta: i64, sensitivity: f64) -> i64 {
    (delta as f64 * sensitivity).round() as i64
}

/// Point-in-time view of a turn accumulator's loop state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnSnapshot {
    /// Motion not yet dispatched
    pub pending_delta: i64,
    /// Last known absolute value, None until one is learned
    pub baseline: Option<i64>,
    /// True while the control is mid-motion
    pub turning: bool,
    /// Commands sent to the controller
    pub dispatched: u64,
    /// Commands the controller failed
    pub failed: u64,
}

#[derive(Debug, Default)]
struct TurnState {
    pending_delta: i64,
    baseline: Option<i64>,
    turning: bool,
    dispatched: u64,
    failed: u64,
}

impl TurnState {
    fn on_turn(&mut self, delta: i64) {
        self.pending_delta = self.pending_delta.saturating_add(delta);
        // Without a baseline there is nothing to move from
        self.turning = self.baseline.is_some();
    }

    /// Returns false when the report was discarded
    fn on_baseline(&mut self, value: i64) -> bool {
        if self.turning {
            return false;
        }
        self.baseline = known(value);
        true
    }

    /// The value to dispatch on this tick, if any
    fn on_tick(&mut self, sensitivity: f64) -> Option<i64> {
        if self.pending_delta == 0 {
            self.turning = false;
            return None;
        }
        let baseline = self.baseline?;
        let value = baseline.saturating_add(scale_turns(self.pending_delta, sensitivity));
        self.baseline = known(value);
        self.pending_delta = 0;
        Some(value)
    }

    fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            pending_delta: self.pending_delta,
            baseline: self.baseline,
            turning: self.turning,
            dispatched: self.dispatched,
            failed: self.failed,
        }
    }
}

/// Zero means "not known yet"
fn known(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

/// Handle to a running turn accumulator
///
/// All reporting methods are non-blocking. Dropping the handle stops the
/// loop as well; use [`TurnAccumulator::close`] to wait for it.
pub struct TurnAccumulator {
    target: Target,
    turns_tx: mpsc::Sender<i64>,
    baseline_tx: mpsc::Sender<i64>,
    query_tx: mpsc::Sender<oneshot::Sender<TurnSnapshot>>,
    shutdown: ShutdownHandle,
}

impl TurnAccumulator {
    /// Spawn the accumulator loop for one control bound to `target`
    pub fn spawn(target: Target, controller: Arc<dyn Controller>, config: &DispatchConfig, sensitivity: f64) -> Self {
        debug!(control = %target, ?config, sensitivity, "TurnAccumulator::spawn: called");
        let (turns_tx, turns_rx) = mpsc::channel(config.intake_buffer);
        let (baseline_tx, baseline_rx) = mpsc::channel(config.intake_buffer);
        let (query_tx, query_rx) = mpsc::channel(8);
        let (shutdown, listener) = shutdown_pair();

        let accumulator = TurnLoop {
            target,
            controller,
            sensitivity,
            tick: config.tick(),
            state: TurnState::default(),
        };
        tokio::spawn(accumulator.run(turns_rx, baseline_rx, query_rx, listener));

        Self {
            target,
            turns_tx,
            baseline_tx,
            query_tx,
            shutdown,
        }
    }

    /// The controller target this accumulator drives
    pub fn target(&self) -> Target {
        self.target
    }

    /// Report relative motion of the control
    pub fn report_turn(&self, delta: i64) {
        offer(&self.turns_tx, delta, self.target, "turn");
    }

    /// Report the controller's current absolute value
    pub fn report_baseline(&self, value: i64) {
        offer(&self.baseline_tx, value, self.target, "baseline");
    }

    /// Read the loop state once all events queued so far are processed
    pub async fn snapshot(&self) -> Result<TurnSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.query_tx
            .send(reply_tx)
            .await
            .map_err(|_| eyre!("Turn accumulator closed"))?;
        reply_rx.await.map_err(|_| eyre!("Turn accumulator closed before reply"))
    }

    /// Stop intake and wait for the loop to exit; idempotent
    pub async fn close(&self) {
        debug!(control = %self.target, "TurnAccumulator::close: called");
        self.shutdown.close().await;
    }

    /// Whether the loop has exited
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }
}

struct TurnLoop {
    target: Target,
    controller: Arc<dyn Controller>,
    sensitivity: f64,
    tick: Duration,
    state: TurnState,
}

impl TurnLoop {
    async fn run(
        mut self,
        mut turns_rx: mpsc::Receiver<i64>,
        mut baseline_rx: mpsc::Receiver<i64>,
        mut query_rx: mpsc::Receiver<oneshot::Sender<TurnSnapshot>>,
        mut shutdown: ShutdownListener,
    ) {
        info!(control = %self.target, "Turn accumulator started");

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
                    self.on_tick().await;
                }

                turn = turns_rx.recv() => match turn {
                    Some(delta) => self.state.on_turn(delta),
                    None => {
                        debug!(control = %self.target, "All handles dropped");
                        break;
                    }
                },

                Some(value) = baseline_rx.recv() => {
                    if !self.state.on_baseline(value) {
                        debug!(control = %self.target, value, "Baseline ignored while turning");
                    }
                }

                Some(reply_tx) = query_rx.recv() => {
                    let _ = reply_tx.send(self.state.snapshot());
                }
            }
        }

        // Drain what was already queued; nothing is dispatched after shutdown
        turns_rx.close();
        baseline_rx.close();
        while let Ok(delta) = turns_rx.try_recv() {
            self.state.on_turn(delta);
        }
        while let Ok(value) = baseline_rx.try_recv() {
            self.state.on_baseline(value);
        }

        info!(
            control = %self.target,
            undispatched = self.state.pending_delta,
            dispatched = self.state.dispatched,
            "Turn accumulator stopped"
        );
    }

    async fn on_tick(&mut self) {
        let Some(value) = self.state.on_tick(self.sensitivity) else {
            return;
        };

        debug!(control = %self.target, value, "Dispatching accumulated turns");
        self.state.dispatched += 1;
        if let Err(e) = self.controller.set_value(self.target, value).await {
            self.state.failed += 1;
            warn!(control = %self.target, value, error = %e, "Cannot change value");
        }
    }
}
