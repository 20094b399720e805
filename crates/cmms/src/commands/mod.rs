//! Command dispatch: bridges CLI args -> core screens -> output formatting.

pub mod config_cmd;
pub mod resources;
pub mod screens;
pub mod util;

use cmms_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Screens(args) => screens::handle(args, cfg, global).await,
        Command::Resources(args) => resources::handle(args, cfg, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Internal(
            "completions are generated before dispatch".into(),
        )),
    }
}
