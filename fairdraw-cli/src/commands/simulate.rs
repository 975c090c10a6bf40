use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use fairdraw_core::{
    CommitRevealProvider, InMemoryLedger, ManualClock, Participant, RaffleConfig,
};
use fairdraw_raffle::{DrawRecord, Keeper, Raffle, RaffleError};
use std::sync::Arc;

#[derive(Args)]
pub struct SimulateArgs {
    /// Comma-separated participant names, one entry each per round
    #[arg(short, long, value_delimiter = ',', required = true)]
    players: Vec<String>,
    /// Number of draws to run
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,
    /// Participant whose payouts are rejected
    #[arg(long)]
    reject_payout_to: Option<String>,
    /// After a failed payout, accept the recipient and re-submit the fulfillment
    #[arg(long)]
    recover: bool,
}

pub async fn run_simulation(args: SimulateArgs, config: RaffleConfig) -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::default());
    let ledger = Arc::new(InMemoryLedger::new());
    let provider = Arc::new(CommitRevealProvider::new());
    let raffle = Arc::new(Raffle::new(
        config.clone(),
        clock.clone(),
        ledger.clone(),
        provider.clone(),
    )?);
    let keeper = Keeper::new(raffle.clone());

    if let Some(name) = &args.reject_payout_to {
        ledger.reject_payouts_to(Participant::from(name.as_str()));
    }

    println!(
        "Simulating raffle {} with {} players over {} rounds",
        raffle.id(),
        args.players.len(),
        args.rounds
    );
    println!();

    for round in 1..=args.rounds {
        for player in &args.players {
            raffle
                .enter(Participant::from(player.as_str()), config.entrance_fee)
                .await?;
        }
        clock.advance(config.interval);

        let Some(request_id) = keeper.poll().await? else {
            println!("Round {}: draw not due, skipping", round);
            continue;
        };

        if let Some(commitment) = provider.commitment(request_id) {
            println!(
                "Round {}: request {} committed to {}",
                round,
                request_id,
                hex::encode(commitment)
            );
        }

        let fulfillment = provider.fulfill(request_id)?;
        match raffle.deliver(fulfillment).await {
            Ok(record) => print_settled(round, &record),
            Err(RaffleError::TransferFailed {
                winner,
                amount,
                reason,
            }) => {
                println!(
                    "Round {}: payout of {} sats to {} failed: {}",
                    round, amount, winner, reason
                );
                println!(
                    "  Settlement rolled back, request {} still outstanding",
                    request_id
                );

                if !args.recover {
                    println!("  Raffle needs operator intervention, stopping");
                    break;
                }

                ledger.accept_payouts_to(&winner);
                let replay = provider
                    .replay(request_id)
                    .ok_or_else(|| anyhow::anyhow!("No fulfillment recorded for {}", request_id))?;
                let record = raffle.deliver(replay).await?;
                println!("  Recovered by re-submitting request {}", request_id);
                print_settled(round, &record);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    print_history(&raffle.draw_history().await, &provider);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Participant", "Won (sats)"]);
    let mut players = args.players.clone();
    players.sort();
    players.dedup();
    for player in &players {
        let paid = ledger.paid_to(&Participant::from(player.as_str()));
        table.add_row(vec![player.clone(), paid.to_sat().to_string()]);
    }
    println!("{}", table);

    let info = raffle.get_info().await?;
    println!(
        "Final state: {:?}, {} entries, pot {} sats",
        info.state,
        info.participant_count,
        info.balance.to_sat()
    );

    Ok(())
}

fn print_settled(round: u32, record: &DrawRecord) {
    println!(
        "Round {}: {} won {} sats (entry {} of {})",
        round,
        record.winner,
        record.prize.to_sat(),
        record.winner_index,
        record.pool_size
    );
}

fn print_history(history: &[DrawRecord], provider: &CommitRevealProvider) {
    if history.is_empty() {
        println!("No completed draws");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Request", "Entries", "Winner", "Prize (sats)", "Word", "Proof"]);

    for record in history {
        let verified = provider
            .replay(record.request_id)
            .map_or(false, |f| f.is_verified());
        let word = record.random_word.to_string();

        table.add_row(vec![
            record.request_id.to_string(),
            record.pool_size.to_string(),
            record.winner.to_string(),
            record.prize.to_sat().to_string(),
            format!("{}...", &word[..16]), // truncated for display
            if verified { "ok" } else { "FAILED" }.to_string(),
        ]);
    }

    println!("{}", table);
}
