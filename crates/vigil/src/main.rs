//! # Vigil
//!
//! Pushes locally compiled smart contracts to the monitoring service.
//!
//! Contracts are read from the build directory of the project, where each
//! compiled contract is stored as a separate JSON artifact. A single project
//! configuration file may list multiple remote projects, each monitoring its
//! own set of networks; contracts are pushed to every one of them in turn.
//!
//! After each upload the contracts acknowledged by the server are reconciled
//! with the locally deployed ones, and any deployment the server did not
//! accept is reported back.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use clap::Parser;
use commands::{Cli, Commands};
use common::{config::Logging, logging};

/// Remote API client.
mod api;

/// CLI subcommands.
mod commands;

/// CLI-specific configuration (authentication, project).
mod config;

/// Project configuration resolution.
mod projects;

/// Contract upload and reconciliation.
mod upload;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => Logging::with_level(level),
        None => config::ProjectConfig::logging(&cli.config_file).unwrap_or_default(),
    };

    logging::init(&logging);

    match cli.command {
        Commands::Auth(args) => commands::auth(args).await?,
        Commands::Init(args) => commands::init(args, &cli.config_file)?,
        Commands::Push(args) => commands::push(args, &cli.config_file).await?,
    }

    Ok(())
}
