//! Opsdeck CLI entry point.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Args, Command};
use commands::App;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,opsdeck_sync=debug".into()),
        )
        .init();

    let args = Args::parse();
    let app = App::new(args.api_base)?;

    match args.command {
        Command::Login { password, email } => app.login(&password, email.as_deref()).await,
        Command::Logout => app.logout(),
        Command::Status => app.status(),
        Command::Dashboard => app.dashboard().await,
        Command::Refresh => app.refresh().await,
        Command::Projects(cmd) => app.run_projects(cmd).await,
        Command::Clients(cmd) => app.run_clients(cmd).await,
        Command::Team(cmd) => app.run_team(cmd).await,
        Command::Tasks(cmd) => app.run_tasks(cmd).await,
        Command::Finance(cmd) => app.run_finance(cmd).await,
    }
}
