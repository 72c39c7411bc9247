/// `auth` subcommand.
mod auth;

/// `init` subcommand.
mod init;

/// `push` subcommand.
mod push;

pub(crate) use auth::auth;
pub(crate) use init::init;
pub(crate) use push::push;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::config::DEFAULT_PROJECT_CONFIG;

/// CLI configuration.
#[derive(Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Project configuration file path.
    #[arg(short, long, default_value = DEFAULT_PROJECT_CONFIG)]
    pub config_file: PathBuf,

    /// Log level, overrides the one set in the project configuration.
    #[arg(short, long)]
    pub log_level: Option<LevelFilter>,

    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Authenticate using the browser flow.
    Auth(Auth),

    /// Create the project configuration file.
    Init(Init),

    /// Push the contracts to the configured projects.
    ///
    /// Pushed contracts are actively monitored afterwards.
    Push(Push),
}

/// `auth` subcommand configuration.
#[derive(Args)]
pub struct Auth {
    /// Custom server path.
    #[arg(short, long)]
    server_path: Option<String>,

    /// Custom web path.
    #[arg(short, long)]
    web_path: Option<String>,
}

/// `init` subcommand configuration.
#[derive(Args)]
pub struct Init {
    /// Project slug, optionally prefixed with the owner account (`owner/project`).
    project_slug: String,

    /// Directory containing compiled contract artifacts.
    #[arg(short, long, default_value = "build/contracts")]
    build_directory: PathBuf,

    /// A comma separated list of networks monitored by default.
    #[arg(short, long)]
    networks: Option<String>,

    /// Overwrite an existing configuration file.
    #[arg(short, long)]
    force: bool,
}

/// `push` subcommand configuration.
#[derive(Args)]
pub struct Push {
    /// Optional tag used for filtering and referencing pushed contracts.
    #[arg(short, long)]
    tag: Option<String>,

    /// A comma separated list of networks to push.
    #[arg(short, long)]
    networks: Option<String>,
}
