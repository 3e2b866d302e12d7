//! rapla-ics CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use rapla_ics_client::cli::{Cli, Command, ConfigAction};
use rapla_ics_client::commands;
use rapla_ics_client::config::ClientConfig;
use rapla_ics_client::error::{ClientError, ClientResult};
use rapla_ics_core::{TracingConfig, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default().with_level(Level::WARN)
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };
    cli.apply_to(&mut config);

    match cli.command {
        None | Some(Command::Run) => commands::run::run(&config).await,
        Some(Command::Links) => commands::links::links(&config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
