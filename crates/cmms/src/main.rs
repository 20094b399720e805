mod cli;
mod commands;
mod error;
mod output;
mod screens;

use std::io;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    let Err(err) = run(cli).await else {
        return;
    };
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    std::process::exit(code);
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// `-v`/`-q`.
fn init_tracing(global: &GlobalOpts) {
    let level = match (global.quiet, global.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "cmms=info,cmms_core=info",
        (false, 2) => "cmms=debug,cmms_core=debug,cmms_api=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(global.verbose > 1)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        Command::Config(args) => commands::config_cmd::handle(args, &global),

        Command::Completions(args) => {
            clap_complete::generate(args.shell, &mut Cli::command(), "cmms", &mut io::stdout());
            Ok(())
        }

        // Everything else works against the backend described by the config file.
        other => {
            let cfg = cmms_config::load_config()?;
            tracing::debug!(command = ?other, profiles = cfg.profiles.len(), "dispatching");
            commands::dispatch(other, &cfg, &global).await
        }
    }
}
