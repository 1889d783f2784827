//! Command-line surface.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "fordwatch",
    version,
    about = "Desktop battery notifications for FordPass electric vehicles",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Vehicle identification number (overrides config and env).
    #[arg(long, global = true, env = "FORDPASS_VIN")]
    pub vin: Option<String>,

    /// FordPass account username/email (overrides config).
    #[arg(short, long, global = true, env = "FORDPASS_USERNAME")]
    pub username: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the battery monitor loop (Ctrl-C to stop).
    Run(RunArgs),

    /// Fetch and print the current battery status once.
    Status,

    /// Manage the configuration file.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Polling interval in seconds (overrides config).
    #[arg(short, long)]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location.
    Path,

    /// Write a starter config file with defaults.
    Init,

    /// Print the effective configuration (credentials redacted).
    Show,

    /// Prompt for the FordPass password and store it in the OS keyring.
    SetPassword,
}
