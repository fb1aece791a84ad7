//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::infra::config::load_config;

/// Deploys signed GitHub releases with atomic promotion
#[derive(Parser)]
#[command(
    name = "autodeploy",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Path to the config file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long, global = true, env = "AUTODEPLOY_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch targets and deploy new releases
    Run(commands::run::RunArgs),

    /// Show the active release of every target
    Status,

    /// Check a local archive against its signature
    Verify(commands::verify::VerifyArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let config = load_config(&self.config)?;
        match self.command {
            Command::Run(args) => commands::run::run(&args, &config).await,
            Command::Status => commands::status::run(&config),
            Command::Verify(args) => commands::verify::run(&args, &config),
        }
    }
}
