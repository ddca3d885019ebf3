//! Clap derive structures for the `blinker` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// blinker -- button-driven blink controller for WLED strips
#[derive(Debug, Parser)]
#[command(
    name = "blinker",
    version,
    about = "Drive a WLED strip from a physical button",
    long_about = "Polls a push button on a GPIO line and answers with timed blink\n\
        patterns on a WLED controller: a short press blinks blue and white,\n\
        a long press blinks a red alert. The strip returns to its default\n\
        appearance afterwards.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "BLINKER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// WLED address (overrides the config file)
    #[arg(long, short = 'd', global = true)]
    pub device: Option<String>,

    /// Also write logs to this file, rotated daily
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the controller: button loop plus connection supervisor
    Run(RunArgs),

    /// Trigger one press sequence without touching the button
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// List the effects the device offers
    #[command(alias = "fx")]
    Effects(EffectsArgs),

    /// Connect once and print a health report as JSON
    Health,

    /// Inspect or edit the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Do not read the GPIO button; only keep the device connected
    #[arg(long)]
    pub no_button: bool,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[arg(value_enum)]
    pub press: Press,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Press {
    /// Blue/white blink for the short flash duration
    Short,
    /// Red alert for the long-press threshold
    Long,
}

#[derive(Debug, Args)]
pub struct EffectsArgs {
    /// Print as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration (file + environment)
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Change settings, e.g. `blinker config set brightness=128 default_mode=effect`
    Set {
        /// KEY=VALUE pairs
        #[arg(required = true, value_name = "KEY=VALUE")]
        pairs: Vec<String>,
    },
}
