//! VFO tuning wheel

use std::sync::Arc;

use eyre::Result;
use tracing::debug;

use super::config::WheelConfig;
use super::key::{FeedbackSink, MidiKey};
use crate::controller::{Controller, Target, Vfo};
use crate::dispatch::{DispatchConfig, TurnAccumulator, TurnSnapshot};

/// Rotary encoder driving the frequency of one VFO
pub struct VfoWheel {
    key: MidiKey,
    trx: u8,
    vfo: Vfo,
    accumulator: TurnAccumulator,
}

impl VfoWheel {
    pub fn new(
        key: MidiKey,
        trx: u8,
        vfo: Vfo,
        controller: Arc<dyn Controller>,
        dispatch: &DispatchConfig,
        wheel: &WheelConfig,
    ) -> Self {
        debug!(%key, trx, %vfo, "VfoWheel::new: called");
        let target = Target::VfoFrequency { trx, vfo };
        Self {
            key,
            trx,
            vfo,
            accumulator: TurnAccumulator::spawn(target, controller, dispatch, wheel.sensitivity),
        }
    }

    pub fn key(&self) -> MidiKey {
        self.key
    }

    /// Encoder moved by `turns` steps (negative is counter-clockwise)
    pub fn turned(&self, turns: i64) {
        self.accumulator.report_turn(turns);
    }

    /// Record the controller's frequency; other VFOs are ignored
    pub fn set_vfo_frequency(&self, trx: u8, vfo: Vfo, frequency: i64) {
        if trx != self.trx || vfo != self.vfo {
            return;
        }
        self.accumulator.report_baseline(frequency);
    }

    pub async fn snapshot(&self) -> Result<TurnSnapshot> {
        self.accumulator.snapshot().await
    }

    pub async fn close(&self) {
        self.accumulator.close().await;
    }
}

impl FeedbackSink for VfoWheel {
    fn feedback(&self, target: Target, value: i64) {
        if let Target::VfoFrequency { trx, vfo } = target {
            self.set_vfo_frequency(trx, vfo, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControlError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(Target, i64)>>,
    }

    #[async_trait]
    impl Controller for RecordingController {
        async fn set_value(&self, target: Target, value: i64) -> Result<(), ControlError> {
            self.calls.lock().unwrap().push((target, value));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wheel_ignores_other_vfo_feedback() {
        let controller = Arc::new(RecordingController::default());
        let wheel = VfoWheel::new(
            MidiKey::new(0, 48),
            0,
            Vfo::B,
            controller.clone(),
            &DispatchConfig::default(),
            &WheelConfig::default(),
        );

        wheel.set_vfo_frequency(0, Vfo::A, 14_000_000);
        wheel.set_vfo_frequency(1, Vfo::B, 21_000_000);
        wheel.feedback(Target::Volume, -20);
        assert_eq!(wheel.snapshot().await.unwrap().baseline, None);

        wheel.feedback(Target::VfoFrequency { trx: 0, vfo: Vfo::B }, 7_100_000);
        wheel.snapshot().await.unwrap();
        wheel.turned(-10);
        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(
            *controller.calls.lock().unwrap(),
            vec![(Target::VfoFrequency { trx: 0, vfo: Vfo::B }, 7_099_982)]
        );
        wheel.close().await;
    }
}
