mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use prizepool_core::{DistributionManager, PoolError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prizepool")]
#[command(about = "Escrowed prize distribution stores")]
#[command(version)]
struct Cli {
    /// Data directory for store and treasury state
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store management commands
    #[command(subcommand)]
    Store(commands::StoreCommands),

    /// Distribution lifecycle commands
    #[command(subcommand)]
    Distribution(commands::DistributionCommands),

    /// Prize commands (add, remove, claim)
    #[command(subcommand)]
    Prize(commands::PrizeCommands),

    /// Local treasury account commands
    #[command(subcommand)]
    Account(commands::AccountCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "prizepool={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| CliConfig::default().data_dir);
    tracing::debug!("Using data directory {}", data_dir.display());

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    // Initialize distribution manager
    let manager = DistributionManager::new(&data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Store(cmd) => commands::handle_store_command(cmd, &manager).await,
        Commands::Distribution(cmd) => commands::handle_distribution_command(cmd, &manager).await,
        Commands::Prize(cmd) => commands::handle_prize_command(cmd, &manager).await,
        Commands::Account(cmd) => commands::handle_account_command(cmd, &manager).await,
    };

    if let Err(e) = result {
        match e {
            PoolError::StoreNotFound { organizer, asset } => {
                eprintln!("Error: No store found for {}/{}", organizer, asset);
                eprintln!("Use 'prizepool store init' to create one");
            }
            PoolError::InsufficientFunds { need, available } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {}, Available: {}", need, available);
                eprintln!("Use 'prizepool account deposit' to fund the caller account");
            }
            PoolError::NotOwner | PoolError::NotOwnerOrAdmin => {
                eprintln!("Error: {}", e);
            }
            PoolError::Expired { id } => {
                eprintln!("Error: Distribution '{}' has expired; claims are closed", id);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
