use crate::config::{config_path, load_or_default};
use anyhow::bail;
use clap::Subcommand;
use fairdraw_core::{Amount, RaffleConfig};
use std::path::Path;
use std::time::Duration;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a raffle config to the data directory
    Init {
        /// Entrance fee in satoshis
        #[arg(short, long, default_value_t = 10_000)]
        fee: u64,
        /// Seconds between draws
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Show the active raffle config
    Show,
}

pub async fn handle_config_command(cmd: ConfigCommands, data_dir: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Init {
            fee,
            interval,
            force,
        } => {
            let path = config_path(data_dir);
            if path.exists() && !force {
                bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }

            let config = RaffleConfig::new(Amount::from_sat(fee), Duration::from_secs(interval));
            config.save(&path).await?;

            println!("Config written to {}", path.display());
            print_config(&config);
        }

        ConfigCommands::Show => {
            let config = load_or_default(data_dir).await?;
            println!("Raffle config ({}):", config_path(data_dir).display());
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &RaffleConfig) {
    println!("  Entrance fee: {} sats", config.entrance_fee.to_sat());
    println!("  Interval: {}s", config.interval.as_secs());
    println!("  Key hash: {}", config.vrf.key_hash);
    println!("  Confirmations: {}", config.vrf.request_confirmations);
    println!("  Callback gas limit: {}", config.vrf.callback_gas_limit);
    println!("  Subscription: {}", config.vrf.subscription_id);
    println!("  Words per draw: {}", config.num_words());
    println!("  Payout warning after: {:?}", config.payout_warn_after);
}
