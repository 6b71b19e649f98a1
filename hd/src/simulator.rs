//! In-process controller simulation driven by a line script
//!
//! The simulated controller applies commands after a configurable latency and
//! reports every applied value back, the way a real transceiver controller
//! pushes state changes to its subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use eyre::{Context, Result, bail, eyre};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::{ControlError, Controller, Target, Vfo, flag_value};
use crate::controls::{
    FeedbackSink, Led, MidiKey, MuteButton, RxChannelEnableButton, SplitEnableButton, VfoWheel, VolumeSlider,
};

/// Simulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimulatorConfig {
    /// Time the simulated controller takes per command
    pub latency_ms: u64,
    /// Initial VFO frequency in Hz
    pub start_frequency: i64,
    /// Initial volume in dB
    pub start_volume: i64,
    /// Transceiver the surface is bound to
    pub trx: u8,
    /// VFO the wheel is bound to
    pub vfo: Vfo,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: 2,
            start_frequency: 7_000_000,
            start_volume: -20,
            trx: 0,
            vfo: Vfo::A,
        }
    }
}

impl SimulatorConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Controller that keeps state in memory and echoes every change
pub struct SimulatedController {
    latency: Duration,
    state: Mutex<HashMap<Target, i64>>,
    applied: Mutex<Vec<(Target, i64)>>,
    feedback_tx: mpsc::UnboundedSender<(Target, i64)>,
    print: bool,
}

impl SimulatedController {
    /// Create a controller and the receiving end of its feedback stream
    pub fn new(latency: Duration, print: bool) -> (Self, mpsc::UnboundedReceiver<(Target, i64)>) {
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        let controller = Self {
            latency,
            state: Mutex::new(HashMap::new()),
            applied: Mutex::new(Vec::new()),
            feedback_tx,
            print,
        };
        (controller, feedback_rx)
    }

    /// A change made on the device itself, bypassing the surface
    pub fn external_change(&self, target: Target, value: i64) {
        debug!(control = %target, value, "SimulatedController::external_change: called");
        self.store(target, value);
        let _ = self.feedback_tx.send((target, value));
    }

    /// Current value of `target`, if it was ever set
    pub fn value(&self, target: Target) -> Option<i64> {
        self.state.lock().ok()?.get(&target).copied()
    }

    /// Every command applied through [`Controller::set_value`], in order
    pub fn applied(&self) -> Vec<(Target, i64)> {
        self.applied.lock().map(|applied| applied.clone()).unwrap_or_default()
    }

    fn store(&self, target: Target, value: i64) {
        if let Ok(mut state) = self.state.lock() {
            state.insert(target, value);
        }
    }

    fn check(target: Target, value: i64) -> Result<(), ControlError> {
        let reason = match target {
            Target::VfoFrequency { .. } if value <= 0 => "frequency must be positive",
            Target::Volume if value > 0 => "volume above 0 dB",
            Target::Mute | Target::RxChannelEnable { .. } | Target::SplitEnable { .. } if !(0..=1).contains(&value) => {
                "flag must be 0 or 1"
            }
            _ => return Ok(()),
        };
        Err(ControlError::Rejected {
            target,
            value,
            reason: reason.to_string(),
        })
    }
}

#[async_trait]
impl Controller for SimulatedController {
    async fn set_value(&self, target: Target, value: i64) -> Result<(), ControlError> {
        tokio::time::sleep(self.latency).await;
        Self::check(target, value)?;

        self.store(target, value);
        if let Ok(mut applied) = self.applied.lock() {
            applied.push((target, value));
        }
        if self.print {
            println!("{} {} = {}", "set".green().bold(), target, value.to_string().cyan());
        }
        self.feedback_tx
            .send((target, value))
            .map_err(|_| ControlError::Disconnected)?;
        Ok(())
    }
}

/// LED that prints its state changes
pub struct PrintingLed;

impl Led for PrintingLed {
    fn set(&self, key: MidiKey, on: bool) {
        let state = if on { "on".yellow() } else { "off".dimmed() };
        println!("{} {} {}", "led".blue(), key, state);
    }
}

/// One line of a simulator script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Turn the VFO wheel by n steps
    Turn(i64),
    /// Move the volume fader to a raw position
    Slide(i64),
    /// Press a button
    Press(ButtonName),
    /// Frequency changed on the device itself
    Frequency(i64),
    /// Volume changed on the device itself
    Volume(i64),
    /// Pause the script
    Wait(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonName {
    Mute,
    Rx,
    Split,
}

/// Parse one script line; blank lines and `#` comments yield None
pub fn parse_line(line: &str) -> Result<Option<ScriptCommand>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let arg = words.next().ok_or_else(|| eyre!("'{}' needs an argument", verb))?;
    if let Some(extra) = words.next() {
        bail!("Unexpected '{}' after '{} {}'", extra, verb, arg);
    }

    let number = || -> Result<i64> { arg.parse().with_context(|| format!("Invalid number '{}'", arg)) };

    let command = match verb {
        "turn" => ScriptCommand::Turn(number()?),
        "slide" => ScriptCommand::Slide(number()?),
        "frequency" => ScriptCommand::Frequency(number()?),
        "volume" => ScriptCommand::Volume(number()?),
        "wait" => {
            let ms: u64 = arg.parse().with_context(|| format!("Invalid duration '{}'", arg))?;
            ScriptCommand::Wait(Duration::from_millis(ms))
        }
        "press" => match arg {
            "mute" => ScriptCommand::Press(ButtonName::Mute),
            "rx" => ScriptCommand::Press(ButtonName::Rx),
            "split" => ScriptCommand::Press(ButtonName::Split),
            other => bail!("Unknown button '{}'", other),
        },
        other => bail!("Unknown command '{}'", other),
    };
    Ok(Some(command))
}

/// The simulated surface: every control wired to one controller
pub struct Surface {
    pub controller: Arc<SimulatedController>,
    pub wheel: Arc<VfoWheel>,
    pub volume: Arc<VolumeSlider>,
    pub mute: Arc<MuteButton>,
    pub rx: Arc<RxChannelEnableButton>,
    pub split: Arc<SplitEnableButton>,
    router: tokio::task::JoinHandle<()>,
    frequency_target: Target,
}

impl Surface {
    /// Build the surface and announce the controller's initial state
    pub fn new(config: &Config, led: Arc<dyn Led>, print: bool) -> Self {
        let sim = &config.simulator;
        let (controller, mut feedback_rx) = SimulatedController::new(sim.latency(), print);
        let controller = Arc::new(controller);
        let as_controller: Arc<dyn Controller> = controller.clone();

        let wheel = Arc::new(VfoWheel::new(
            MidiKey::new(0, 60),
            sim.trx,
            sim.vfo,
            as_controller.clone(),
            &config.dispatch,
            &config.wheel,
        ));
        let volume = Arc::new(VolumeSlider::new(
            MidiKey::new(0, 7),
            as_controller.clone(),
            &config.dispatch,
            config.volume,
        ));
        let mute = Arc::new(MuteButton::new(MidiKey::new(0, 16), led.clone(), as_controller.clone()));
        let rx = Arc::new(RxChannelEnableButton::new(
            MidiKey::new(0, 17),
            sim.trx,
            sim.vfo,
            led.clone(),
            as_controller.clone(),
        ));
        let split = Arc::new(SplitEnableButton::new(MidiKey::new(0, 18), sim.trx, led, as_controller));

        let sinks: Vec<Arc<dyn FeedbackSink>> = vec![
            wheel.clone(),
            volume.clone(),
            mute.clone(),
            rx.clone(),
            split.clone(),
        ];
        let router = tokio::spawn(async move {
            while let Some((target, value)) = feedback_rx.recv().await {
                for sink in &sinks {
                    sink.feedback(target, value);
                }
            }
            debug!("Feedback router stopped");
        });

        let frequency_target = Target::VfoFrequency {
            trx: sim.trx,
            vfo: sim.vfo,
        };
        controller.external_change(frequency_target, sim.start_frequency);
        controller.external_change(Target::Volume, sim.start_volume);
        controller.external_change(Target::Mute, 0);
        controller.external_change(Target::RxChannelEnable { trx: sim.trx, vfo: sim.vfo }, 1);
        controller.external_change(Target::SplitEnable { trx: sim.trx }, 0);

        Self {
            controller,
            wheel,
            volume,
            mute,
            rx,
            split,
            router,
            frequency_target,
        }
    }

    /// Apply one script command
    pub async fn apply(&self, command: ScriptCommand) {
        debug!(?command, "Surface::apply: called");
        match command {
            ScriptCommand::Turn(turns) => self.wheel.turned(turns),
            ScriptCommand::Slide(raw) => self.volume.changed(raw),
            ScriptCommand::Press(ButtonName::Mute) => self.mute.pressed().await,
            ScriptCommand::Press(ButtonName::Rx) => self.rx.pressed().await,
            ScriptCommand::Press(ButtonName::Split) => self.split.pressed().await,
            ScriptCommand::Frequency(hz) => self.controller.external_change(self.frequency_target, hz),
            ScriptCommand::Volume(db) => self.controller.external_change(Target::Volume, db),
            ScriptCommand::Wait(duration) => tokio::time::sleep(duration).await,
        }
    }

    /// Close every coalescer and stop feedback routing
    pub async fn close(self) {
        tokio::join!(self.wheel.close(), self.volume.close());
        self.router.abort();
        let _ = self.router.await;
        info!("Surface closed");
    }
}

/// Final controller state after a script run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSummary {
    pub commands: usize,
    pub frequency: Option<i64>,
    pub volume: Option<i64>,
    pub muted: Option<bool>,
    pub split: Option<bool>,
}

/// Run a script against a freshly built surface
pub async fn run_script<R>(config: &Config, input: R, print: bool) -> Result<SimulationSummary>
where
    R: AsyncBufRead + Unpin,
{
    let led: Arc<dyn Led> = if print {
        Arc::new(PrintingLed)
    } else {
        Arc::new(SilentLed)
    };
    let surface = Surface::new(config, led, print);
    let mut lines = input.lines();
    let mut commands = 0usize;
    let mut line_no = 0usize;

    let outcome: Result<()> = async {
        while let Some(line) = lines.next_line().await.context("Failed to read script")? {
            line_no += 1;
            match parse_line(&line).with_context(|| format!("Script line {}", line_no))? {
                Some(command) => {
                    surface.apply(command).await;
                    commands += 1;
                }
                None => continue,
            }
        }
        Ok(())
    }
    .await;

    let controller = surface.controller.clone();
    let frequency_target = surface.frequency_target;
    surface.close().await;
    outcome?;

    let sim = &config.simulator;
    let summary = SimulationSummary {
        commands,
        frequency: controller.value(frequency_target),
        volume: controller.value(Target::Volume),
        muted: controller.value(Target::Mute).map(|v| v == flag_value(true)),
        split: controller.value(Target::SplitEnable { trx: sim.trx }).map(|v| v != 0),
    };
    info!(?summary, "Script finished");
    if summary.commands == 0 {
        warn!("Script contained no commands");
    }
    Ok(summary)
}

struct SilentLed;

impl Led for SilentLed {
    fn set(&self, _key: MidiKey, _on: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.simulator.latency_ms = 1;
        config
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("turn -3").unwrap(), Some(ScriptCommand::Turn(-3)));
        assert_eq!(parse_line("  slide 64  ").unwrap(), Some(ScriptCommand::Slide(64)));
        assert_eq!(
            parse_line("press split").unwrap(),
            Some(ScriptCommand::Press(ButtonName::Split))
        );
        assert_eq!(
            parse_line("wait 25 # settle").unwrap(),
            Some(ScriptCommand::Wait(Duration::from_millis(25)))
        );
        assert_eq!(parse_line("# comment").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line("turn").is_err());
        assert!(parse_line("turn many").is_err());
        assert!(parse_line("press power").is_err());
        assert!(parse_line("jump 3").is_err());
        assert!(parse_line("slide 3 4").is_err());
    }

    #[tokio::test]
    async fn test_controller_rejects_out_of_domain_values() {
        let (controller, _rx) = SimulatedController::new(Duration::ZERO, false);
        let err = controller.set_value(Target::Volume, 6).await.unwrap_err();
        assert!(matches!(err, ControlError::Rejected { .. }));
        assert!(controller.applied().is_empty());

        controller.set_value(Target::Volume, -6).await.unwrap();
        assert_eq!(controller.value(Target::Volume), Some(-6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_tunes_and_fades() {
        let script = "\
# tune up five steps, then pull the fader to the top
turn 5
wait 30
slide 127
wait 30
press mute
wait 10
";
        let summary = run_script(&quiet_config(), script.as_bytes(), false).await.unwrap();

        assert_eq!(summary.commands, 6);
        assert_eq!(summary.frequency, Some(7_000_009));
        assert_eq!(summary.volume, Some(0));
        assert_eq!(summary.muted, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_change_rebases_wheel() {
        let script = "\
frequency 14074000
wait 20
turn -10
wait 30
";
        let summary = run_script(&quiet_config(), script.as_bytes(), false).await.unwrap();
        assert_eq!(summary.frequency, Some(14_073_982));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_script_line_still_closes() {
        let err = run_script(&quiet_config(), "turn 1\nfly 2\n".as_bytes(), false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
