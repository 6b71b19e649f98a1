//! HamDeck - MIDI control surface bridge
//!
//! CLI entry point for the simulator and configuration inspection.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::io::BufReader;
use tracing::{debug, info};

use hamdeck::cli::{Cli, Command};
use hamdeck::config::Config;
use hamdeck::simulator::{self, SimulationSummary};

const LOG_DIR_ENV: &str = "HAMDECK_LOG_DIR";

fn log_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hamdeck")
        .join("logs")
}

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    let log_file = fs::File::create(log_dir.join("hamdeck.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Simulate { script, quiet } => cmd_simulate(&config, script, quiet).await,
        Command::Config => cmd_config(&config),
    }
}

/// Run a script against the simulated controller
async fn cmd_simulate(config: &Config, script: Option<PathBuf>, quiet: bool) -> Result<()> {
    debug!(?script, quiet, "cmd_simulate: called");
    let summary = match script {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            simulator::run_script(config, BufReader::new(file), !quiet).await?
        }
        None => simulator::run_script(config, BufReader::new(tokio::io::stdin()), !quiet).await?,
    };
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SimulationSummary) {
    let show = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    let flag = |value: Option<bool>| match value {
        Some(true) => "on".to_string(),
        Some(false) => "off".to_string(),
        None => "-".to_string(),
    };

    println!();
    println!("{}", "Final controller state".bold());
    println!("----------------------");
    println!("Commands:  {}", summary.commands);
    println!("Frequency: {}", show(summary.frequency));
    println!("Volume:    {}", show(summary.volume));
    println!("Mute:      {}", flag(summary.muted));
    println!("Split:     {}", flag(summary.split));
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
