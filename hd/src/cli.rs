//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HamDeck - MIDI control surface bridge
#[derive(Parser)]
#[command(
    name = "hd",
    about = "Coalescing bridge between a MIDI control surface and a transceiver controller",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive a simulated controller from a script (stdin by default)
    Simulate {
        /// Script file with one command per line
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Print only the final state
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}
