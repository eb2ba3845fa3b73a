//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod led;
pub mod run;
pub mod schedules;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Runtime;
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler. The
/// controller is already started and holds the effective config.
pub async fn dispatch(
    cmd: Command,
    runtime: &Runtime,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = &runtime.controller;
    match cmd {
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Led(args) => led::handle(controller, args, global).await,
        Command::Schedules(args) => schedules::handle(controller, args, global).await,
        Command::Run(_) => run::handle(controller, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
