mod commands;
mod config;

use clap::{Parser, Subcommand};
use fairdraw_raffle::RaffleError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fairdraw")]
#[command(about = "fairdraw - recurring raffles with verifiable randomness")]
#[command(version)]
struct Cli {
    /// Data directory for raffle config
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
    /// Raffle configuration commands
    #[command(subcommand)]
    Config(commands::ConfigCommands),

    /// Run an in-process raffle
    Simulate(commands::SimulateArgs),

    /// Check a randomness proof
    Verify(commands::VerifyArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "fairdraw_cli={},fairdraw_core={},fairdraw_raffle={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    tokio::fs::create_dir_all(&data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Config(cmd) => commands::handle_config_command(cmd, &data_dir).await,
        Commands::Simulate(args) => match config::load_or_default(&data_dir).await {
            Ok(raffle_config) => commands::run_simulation(args, raffle_config).await,
            Err(e) => Err(e),
        },
        Commands::Verify(args) => commands::verify_proof(args),
    };

    if let Err(e) = result {
        match e.downcast_ref::<RaffleError>() {
            Some(RaffleError::InsufficientStake { sent, required }) => {
                eprintln!("Error: Stake too low");
                eprintln!("Sent: {} sats, Entrance fee: {} sats", sent, required);
            }
            Some(RaffleError::TransferFailed { winner, amount, .. }) => {
                eprintln!("Error: Payout of {} sats to {} failed", amount, winner);
                eprintln!("The draw was rolled back and needs operator intervention");
            }
            _ => {
                eprintln!("Error: {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
