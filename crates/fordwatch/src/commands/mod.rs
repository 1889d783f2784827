//! Command dispatch: bridges CLI args to the core monitor and API client.

pub mod config_cmd;
pub mod run;
pub mod status;
pub mod util;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Dispatch the parsed command line to the appropriate handler.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run(args) => run::handle(args, &cli.global).await,
        Command::Status => status::handle(&cli.global).await,
        Command::Config(args) => config_cmd::handle(&args, &cli.global),
    }
}
