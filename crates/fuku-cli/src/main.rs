#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Entry point: parses the CLI surface, dispatches to the matching
//! command, and turns any [`ExitError`] into a single stderr line plus the
//! carried process exit code.

mod cli;
mod color;
mod controller;
mod exit_error;
mod formatter;
mod logs;
mod paths;
mod run;
mod stop;

use clap::Parser;

use cli::{Cli, Command};
use exit_error::ExitError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = dispatch(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.code);
    }
}

async fn dispatch(cli: Cli) -> Result<(), ExitError> {
    match cli.command {
        Some(Command::Run { profile, no_ui, stats }) => {
            run::run(profile, no_ui || cli.no_ui, stats || cli.stats).await
        }
        Some(Command::Logs { services, profile }) => logs::run(services, profile.or(cli.profile)).await,
        Some(Command::Stop) => stop::run(),
        None if cli.logs_flag => logs::run(Vec::new(), cli.profile).await,
        None => run::run(cli.run_flag, cli.no_ui, cli.stats).await,
    }
}
