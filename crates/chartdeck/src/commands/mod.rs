//! Command dispatch: bridges CLI args -> view controllers -> output formatting.

pub mod charts;
pub mod config_cmd;
pub mod settings;
pub mod status;
pub mod util;

use chartdeck_core::ConsoleConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    console: &ConsoleConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = console.build_client()?;
    match cmd {
        Command::Status(args) => status::handle(&client, console, args, global).await,
        Command::Charts(args) => charts::handle(&client, console, args, global).await,
        Command::Settings(args) => settings::handle(&client, console, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
