//! Toggle buttons - direct call-through with an indicator light
//!
//! A press asks the controller for the opposite of the last reported state.
//! The recorded state only changes when the controller reports back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::key::{FeedbackSink, Led, MidiKey};
use crate::controller::{Controller, Target, Vfo, flag_value};

struct Toggle {
    key: MidiKey,
    target: Target,
    led: Arc<dyn Led>,
    controller: Arc<dyn Controller>,
    on: AtomicBool,
    /// Light the LED while the state is off
    inverted: bool,
}

impl Toggle {
    fn new(key: MidiKey, target: Target, led: Arc<dyn Led>, controller: Arc<dyn Controller>, inverted: bool) -> Self {
        Self {
            key,
            target,
            led,
            controller,
            on: AtomicBool::new(false),
            inverted,
        }
    }

    async fn pressed(&self) {
        let wanted = !self.on.load(Ordering::SeqCst);
        debug!(key = %self.key, control = %self.target, wanted, "Toggle::pressed: called");
        if let Err(e) = self.controller.set_value(self.target, flag_value(wanted)).await {
            warn!(control = %self.target, wanted, error = %e, "Cannot toggle");
        }
    }

    fn set(&self, on: bool) {
        self.on.store(on, Ordering::SeqCst);
        self.led.set(self.key, on != self.inverted);
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

/// Master mute; the LED is lit while audio is live
pub struct MuteButton {
    toggle: Toggle,
}

impl MuteButton {
    pub fn new(key: MidiKey, led: Arc<dyn Led>, controller: Arc<dyn Controller>) -> Self {
        Self {
            toggle: Toggle::new(key, Target::Mute, led, controller, true),
        }
    }

    pub fn key(&self) -> MidiKey {
        self.toggle.key
    }

    pub async fn pressed(&self) {
        self.toggle.pressed().await;
    }

    /// Record the controller's mute state
    pub fn set_mute(&self, muted: bool) {
        self.toggle.set(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.toggle.is_on()
    }
}

impl FeedbackSink for MuteButton {
    fn feedback(&self, target: Target, value: i64) {
        if target == Target::Mute {
            self.set_mute(value != 0);
        }
    }
}

/// Enables the receive channel of one VFO
pub struct RxChannelEnableButton {
    trx: u8,
    vfo: Vfo,
    toggle: Toggle,
}

impl RxChannelEnableButton {
    pub fn new(key: MidiKey, trx: u8, vfo: Vfo, led: Arc<dyn Led>, controller: Arc<dyn Controller>) -> Self {
        Self {
            trx,
            vfo,
            toggle: Toggle::new(key, Target::RxChannelEnable { trx, vfo }, led, controller, false),
        }
    }

    pub fn key(&self) -> MidiKey {
        self.toggle.key
    }

    pub async fn pressed(&self) {
        self.toggle.pressed().await;
    }

    /// Record the controller's state; other receivers are ignored
    pub fn set_rx_channel_enable(&self, trx: u8, vfo: Vfo, enabled: bool) {
        if trx != self.trx || vfo != self.vfo {
            return;
        }
        self.toggle.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.toggle.is_on()
    }
}

impl FeedbackSink for RxChannelEnableButton {
    fn feedback(&self, target: Target, value: i64) {
        if let Target::RxChannelEnable { trx, vfo } = target {
            self.set_rx_channel_enable(trx, vfo, value != 0);
        }
    }
}

/// Split operation of one transceiver
pub struct SplitEnableButton {
    trx: u8,
    toggle: Toggle,
}

impl SplitEnableButton {
    pub fn new(key: MidiKey, trx: u8, led: Arc<dyn Led>, controller: Arc<dyn Controller>) -> Self {
        Self {
            trx,
            toggle: Toggle::new(key, Target::SplitEnable { trx }, led, controller, false),
        }
    }

    pub fn key(&self) -> MidiKey {
        self.toggle.key
    }

    pub async fn pressed(&self) {
        self.toggle.pressed().await;
    }

    /// Record the controller's state; other transceivers are ignored
    pub fn set_split_enable(&self, trx: u8, enabled: bool) {
        if trx != self.trx {
            return;
        }
        self.toggle.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.toggle.is_on()
    }
}

impl FeedbackSink for SplitEnableButton {
    fn feedback(&self, target: Target, value: i64) {
        if let Target::SplitEnable { trx } = target {
            self.set_split_enable(trx, value != 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControlError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLed {
        states: Mutex<Vec<(MidiKey, bool)>>,
    }

    impl Led for RecordingLed {
        fn set(&self, key: MidiKey, on: bool) {
            self.states.lock().unwrap().push((key, on));
        }
    }

    #[derive(Default)]
    struct RecordingController {
        calls: Mutex<Vec<(Target, i64)>>,
        fail: bool,
    }

    #[async_trait]
    impl Controller for RecordingController {
        async fn set_value(&self, target: Target, value: i64) -> Result<(), ControlError> {
            self.calls.lock().unwrap().push((target, value));
            if self.fail {
                return Err(ControlError::Disconnected);
            }
            Ok(())
        }
    }

    const KEY: MidiKey = MidiKey { channel: 0, key: 16 };

    #[tokio::test]
    async fn test_mute_press_sends_opposite_state() {
        let led = Arc::new(RecordingLed::default());
        let controller = Arc::new(RecordingController::default());
        let button = MuteButton::new(KEY, led.clone(), controller.clone());

        button.pressed().await;
        button.set_mute(true);
        button.pressed().await;

        assert_eq!(
            *controller.calls.lock().unwrap(),
            vec![(Target::Mute, 1), (Target::Mute, 0)]
        );
        // LED is lit while not muted
        assert_eq!(*led.states.lock().unwrap(), vec![(KEY, false)]);
        assert!(button.is_muted());
    }

    #[tokio::test]
    async fn test_press_failure_does_not_change_state() {
        let led = Arc::new(RecordingLed::default());
        let controller = Arc::new(RecordingController {
            fail: true,
            ..Default::default()
        });
        let button = SplitEnableButton::new(KEY, 0, led.clone(), controller.clone());

        button.pressed().await;
        assert!(!button.is_enabled());
        assert!(led.states.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rx_enable_ignores_other_receivers() {
        let led = Arc::new(RecordingLed::default());
        let controller = Arc::new(RecordingController::default());
        let button = RxChannelEnableButton::new(KEY, 0, Vfo::B, led.clone(), controller);

        button.set_rx_channel_enable(1, Vfo::B, true);
        button.set_rx_channel_enable(0, Vfo::A, true);
        assert!(!button.is_enabled());

        button.set_rx_channel_enable(0, Vfo::B, true);
        assert!(button.is_enabled());
        assert_eq!(*led.states.lock().unwrap(), vec![(KEY, true)]);
    }

    #[test]
    fn test_split_feedback_filters_by_target() {
        let led = Arc::new(RecordingLed::default());
        let controller = Arc::new(RecordingController::default());
        let button = SplitEnableButton::new(KEY, 1, led.clone(), controller);

        button.feedback(Target::SplitEnable { trx: 0 }, 1);
        button.feedback(Target::Mute, 1);
        assert!(!button.is_enabled());

        button.feedback(Target::SplitEnable { trx: 1 }, 1);
        assert!(button.is_enabled());
    }
}
