mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apled_core::RuntimeSettings;

use crate::cli::{Cli, Command};
use crate::config::Runtime;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a controller
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "apled", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load(&cli.global)?;
            let settings = match cmd {
                Command::Run(ref args) => commands::run::settings(args, &cfg)?,
                _ => RuntimeSettings::oneshot(),
            };
            let runtime = config::build_runtime(settings)?;

            runtime.controller.start().await?;
            let result = async {
                prepare(&runtime, &cfg).await?;
                tracing::debug!(command = ?cmd, "dispatching command");
                commands::dispatch(cmd, &runtime, &cli.global).await
            }
            .await;
            runtime.controller.shutdown().await;
            result
        }
    }
}

/// Restore persisted schedules and install the connection to use.
async fn prepare(runtime: &Runtime, cfg: &apled_config::Config) -> Result<(), CliError> {
    let controller = &runtime.controller;
    controller.load_persisted_state().await?;

    let effective =
        config::effective_controller_config(cfg, &controller.config(), runtime.vault.as_ref())?;
    if effective.is_configured() {
        controller.set_config(effective).await?;
    }
    Ok(())
}
