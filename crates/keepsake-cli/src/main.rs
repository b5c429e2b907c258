//! Keepsake CLI - a shared gallery, a notes board and a letter, from the terminal

mod cli;
mod commands;
mod config_profiles;
mod error;
mod prompts;
mod session_store;

use clap::Parser;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::gallery::run_gallery;
use crate::commands::notes::run_notes;
use crate::commands::proposal::run_proposal;
use crate::commands::route::run_route;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let default_directive = "keepsake=info"
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Auth { command } => run_auth(command, profile).await?,
        Commands::Gallery { command } => run_gallery(command, profile).await?,
        Commands::Notes { command } => run_notes(command, profile).await?,
        Commands::Proposal { instant } => run_proposal(instant, profile).await?,
        Commands::Route { path } => run_route(&path, profile).await?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
