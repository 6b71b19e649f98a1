//! HamDeck configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::controls::{VolumeConfig, WheelConfig};
use crate::dispatch::DispatchConfig;
use crate::simulator::SimulatorConfig;

/// Largest accepted intake queue depth
const MAX_INTAKE_BUFFER: usize = 1 << 20;

/// Main HamDeck configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Tick and intake settings shared by all coalescers
    pub dispatch: DispatchConfig,

    /// VFO wheel tuning
    pub wheel: WheelConfig,

    /// Volume fader range
    pub volume: VolumeConfig,

    /// Simulated controller used by `hd simulate`
    pub simulator: SimulatorConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.tick_ms == 0 {
            return Err(eyre!("dispatch.tick-ms must be greater than zero"));
        }
        if self.dispatch.intake_buffer == 0 {
            return Err(eyre!("dispatch.intake-buffer must be greater than zero"));
        }
        if self.dispatch.intake_buffer > MAX_INTAKE_BUFFER {
            return Err(eyre!(
                "dispatch.intake-buffer must be at most {}, got {}",
                MAX_INTAKE_BUFFER,
                self.dispatch.intake_buffer
            ));
        }
        if !self.wheel.sensitivity.is_finite() || self.wheel.sensitivity <= 0.0 {
            return Err(eyre!(
                "wheel.sensitivity must be a positive number, got {}",
                self.wheel.sensitivity
            ));
        }
        if self.volume.input_max <= 0 {
            return Err(eyre!("volume.input-max must be greater than zero"));
        }
        if self.volume.min_db >= self.volume.max_db {
            return Err(eyre!(
                "volume.min-db ({}) must be below volume.max-db ({})",
                self.volume.min_db,
                self.volume.max_db
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .hamdeck.yml
        let local_config = PathBuf::from(".hamdeck.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/hamdeck/hamdeck.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed here; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".hamdeck.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hamdeck").join("hamdeck.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Vfo;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.dispatch.tick_ms, 10);
        assert_eq!(config.dispatch.intake_buffer, 1000);
        assert_eq!(config.wheel.sensitivity, 1.8);
        assert_eq!(config.volume.min_db, -60);
        assert_eq!(config.simulator.vfo, Vfo::A);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
dispatch:
  tick-ms: 20
  intake-buffer: 64

wheel:
  sensitivity: 10.0

volume:
  min-db: -40
  max-db: 0
  input-max: 100

simulator:
  latency-ms: 15
  vfo: b
  trx: 1

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.dispatch.tick_ms, 20);
        assert_eq!(config.dispatch.intake_buffer, 64);
        assert_eq!(config.wheel.sensitivity, 10.0);
        assert_eq!(config.volume.input_max, 100);
        assert_eq!(config.simulator.latency_ms, 15);
        assert_eq!(config.simulator.vfo, Vfo::B);
        assert_eq!(config.simulator.trx, 1);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
wheel:
  sensitivity: 3.0
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.wheel.sensitivity, 3.0);

        // Defaults for unspecified
        assert_eq!(config.dispatch.tick_ms, 10);
        assert_eq!(config.volume.max_db, 0);
        assert_eq!(config.simulator.start_frequency, 7_000_000);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.dispatch.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.intake_buffer = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("intake-buffer"));

        let mut config = Config::default();
        config.dispatch.intake_buffer = MAX_INTAKE_BUFFER;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.wheel.sensitivity = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.volume.min_db = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min-db"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dispatch:\n  tick-ms: 5\nlog-level: WARN").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.dispatch.tick_ms, 5);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/hamdeck.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }
}
