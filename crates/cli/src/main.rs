//! Milestone CLI - Offline administration of a milestone data directory
//!
//! Usage:
//!   milestone init [dir]                        - Write an example setup
//!   milestone check                             - Validate definitions
//!   milestone progress <uuid>                   - Show stored progress
//!   milestone grant <uuid> <id> [--name N]      - Complete a milestone
//!   milestone revoke <uuid> <id>                - Reset a milestone
//!   milestone top [--window W] [--limit N]      - Print a ranking

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::commands::{
    CheckCommand, Context, GrantCommand, InitCommand, ProgressCommand, RevokeCommand, TopCommand,
};

#[derive(Parser)]
#[command(name = "milestone")]
#[command(about = "Milestone - achievement tracking administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: <data-dir>/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding settings, definitions and the SQLite file
    #[arg(short, long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Verbose logging (also enabled by `debug: true` in settings)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example config.yml and milestones/ tree
    Init(InitCommand),
    /// Print the registration plan and definition problems
    Check(CheckCommand),
    /// Show a player's stored progress
    Progress(ProgressCommand),
    /// Complete a milestone for a player
    Grant(GrantCommand),
    /// Reset a milestone for a player
    Revoke(RevokeCommand),
    /// Print a leaderboard
    Top(TopCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = Context::new(cli.data_dir).with_config(cli.config);

    let debug = cli.debug || ctx.settings().is_ok_and(|s| s.debug);
    let default_filter = if debug { "debug" } else { "info,sqlx=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init(cmd) => cmd.run(),
        Commands::Check(cmd) => cmd.run(&ctx),
        Commands::Progress(cmd) => cmd.run(&ctx).await,
        Commands::Grant(cmd) => cmd.run(&ctx).await,
        Commands::Revoke(cmd) => cmd.run(&ctx).await,
        Commands::Top(cmd) => cmd.run(&ctx).await,
    }
}
