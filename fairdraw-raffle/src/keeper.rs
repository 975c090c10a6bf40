use crate::error::{RaffleError, Result};
use crate::raffle::Raffle;
use fairdraw_core::RequestId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// External trigger that starts draws when they are due.
pub struct Keeper {
    raffle: Arc<Raffle>,
}

impl Keeper {
    pub fn new(raffle: Arc<Raffle>) -> Self {
        Self { raffle }
    }

    /// Start a draw if one is due. Returns the issued request id.
    pub async fn poll(&self) -> Result<Option<RequestId>> {
        let status = self.raffle.check_upkeep().await?;
        if !status.is_due() {
            return Ok(None);
        }

        match self.raffle.start_draw().await {
            Ok(request_id) => Ok(Some(request_id)),
            Err(RaffleError::UpkeepNotNeeded { .. }) => {
                tracing::debug!("Raffle {} no longer due", self.raffle.id());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll every `period` until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        tracing::info!("Keeper for raffle {} polling every {:?}", self.raffle.id(), period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        tracing::warn!("Keeper poll for raffle {} failed: {}", self.raffle.id(), e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Keeper for raffle {} stopped", self.raffle.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RaffleState;
    use fairdraw_core::{
        Amount, CommitRevealProvider, InMemoryLedger, ManualClock, Participant, RaffleConfig,
    };

    fn raffle(clock: Arc<ManualClock>) -> Arc<Raffle> {
        let config = RaffleConfig::new(Amount::from_sat(500), Duration::from_secs(60));
        Arc::new(
            Raffle::new(
                config,
                clock,
                Arc::new(InMemoryLedger::new()),
                Arc::new(CommitRevealProvider::new()),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_poll_starts_draw_only_when_due() {
        let clock = Arc::new(ManualClock::default());
        let raffle = raffle(clock.clone());
        let keeper = Keeper::new(raffle.clone());

        assert_eq!(keeper.poll().await.unwrap(), None);

        raffle
            .enter(Participant::from("alice"), Amount::from_sat(500))
            .await
            .unwrap();
        assert_eq!(keeper.poll().await.unwrap(), None);

        clock.advance(Duration::from_secs(60));
        let request_id = keeper.poll().await.unwrap();
        assert!(request_id.is_some());
        assert_eq!(raffle.outstanding_request().await, request_id);

        assert_eq!(keeper.poll().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::default());
        let raffle = raffle(clock.clone());
        raffle
            .enter(Participant::from("alice"), Amount::from_sat(500))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(60));

        let (tx, rx) = watch::channel(false);
        let keeper = Keeper::new(raffle.clone());
        let task = tokio::spawn(async move { keeper.run(Duration::from_millis(5), rx).await });

        while raffle.state().await != RaffleState::Calculating {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
