//! Volume fader

use std::sync::Arc;

use eyre::Result;
use tracing::debug;

use super::config::VolumeConfig;
use super::key::{FeedbackSink, MidiKey};
use crate::controller::{Controller, Target};
use crate::dispatch::{DispatchConfig, SlideSnapshot, ValueCoalescer};

/// Fader driving the master volume in dB
pub struct VolumeSlider {
    key: MidiKey,
    range: VolumeConfig,
    coalescer: ValueCoalescer,
}

impl VolumeSlider {
    pub fn new(key: MidiKey, controller: Arc<dyn Controller>, dispatch: &DispatchConfig, range: VolumeConfig) -> Self {
        debug!(%key, ?range, "VolumeSlider::new: called");
        Self {
            key,
            range,
            coalescer: ValueCoalescer::spawn(Target::Volume, controller, dispatch),
        }
    }

    pub fn key(&self) -> MidiKey {
        self.key
    }

    /// Fader moved to the raw position `value`
    pub fn changed(&self, value: i64) {
        self.coalescer.report_target(self.range.translate(value));
    }

    /// Record the controller's volume in dB
    pub fn set_volume(&self, db: i64) {
        self.coalescer.report_active(db);
    }

    pub async fn snapshot(&self) -> Result<SlideSnapshot> {
        self.coalescer.snapshot().await
    }

    pub async fn close(&self) {
        self.coalescer.close().await;
    }
}

impl FeedbackSink for VolumeSlider {
    fn feedback(&self, target: Target, value: i64) {
        if target == Target::Volume {
            self.set_volume(value);
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
    async fn test_changed_translates_raw_position() {
        let controller = Arc::new(RecordingController::default());
        let slider = VolumeSlider::new(
            MidiKey::new(0, 7),
            controller.clone(),
            &DispatchConfig::default(),
            VolumeConfig::default(),
        );
        slider.set_volume(-60);
        slider.snapshot().await.unwrap();

        slider.changed(127);
        let snap = slider.snapshot().await.unwrap();
        assert_eq!(snap.selected, 0);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(controller.calls.lock().unwrap().first(), Some(&(Target::Volume, 0)));

        slider.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_for_other_targets_is_ignored() {
        let controller = Arc::new(RecordingController::default());
        let slider = VolumeSlider::new(
            MidiKey::new(0, 7),
            controller,
            &DispatchConfig::default(),
            VolumeConfig::default(),
        );

        slider.feedback(Target::Mute, 1);
        slider.feedback(Target::Volume, -18);
        let snap = slider.snapshot().await.unwrap();
        assert_eq!(snap.active, -18);
        assert_eq!(snap.selected, -18);

        slider.close().await;
    }
}
