use crate::error::{RaffleError, Result};
use crate::events::RaffleEvent;
use crate::state::{RaffleStateMachine, Snapshot};
use chrono::{DateTime, Utc};
use fairdraw_core::{Amount, Clock, FundsLedger, Participant, RandomWord, RequestId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A completed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub request_id: RequestId,
    pub winner: Participant,
    pub winner_index: usize,
    pub pool_size: usize,
    pub prize: Amount,
    pub random_word: RandomWord,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub winner: Participant,
    pub winner_index: usize,
    pub pool_size: usize,
}

/// Committed settlement plus the events to publish for it.
#[derive(Debug)]
pub struct Settlement {
    pub record: DrawRecord,
    pub events: Vec<RaffleEvent>,
}

/// Binds winner selection, pool reset, timestamp update and payout into one
/// unit. State changes are applied before the payout; a failed payout, or a
/// `settle` future dropped before the payout resolves, restores the machine to
/// exactly what it was before `settle`.
pub struct SettlementCoordinator<'a> {
    ledger: &'a dyn FundsLedger,
    clock: &'a dyn Clock,
    payout_warn_after: Duration,
}

impl<'a> SettlementCoordinator<'a> {
    pub fn new(
        ledger: &'a dyn FundsLedger,
        clock: &'a dyn Clock,
        payout_warn_after: Duration,
    ) -> Self {
        Self {
            ledger,
            clock,
            payout_warn_after,
        }
    }

    pub async fn settle(
        &self,
        machine: &mut RaffleStateMachine,
        request_id: RequestId,
        word: RandomWord,
    ) -> Result<Settlement> {
        let prize = self.ledger.balance().await?;

        let settled_at = self.clock.now();
        let mut pending = PendingSettlement::begin(machine);
        let selection = pending
            .machine
            .apply_settlement(request_id, word, settled_at)?;

        let events = vec![RaffleEvent::WinnerPicked {
            winner: selection.winner.clone(),
            prize,
        }];

        if let Err(e) = self.pay(&selection.winner, prize).await {
            drop(pending);
            tracing::error!(
                "Payout of {} sats to {} for request {} failed, settlement rolled back: {}",
                prize.to_sat(),
                selection.winner,
                request_id,
                e
            );
            return Err(RaffleError::TransferFailed {
                winner: selection.winner,
                amount: prize.to_sat(),
                reason: e.to_string(),
            });
        }
        pending.commit();

        let record = DrawRecord {
            request_id,
            winner: selection.winner,
            winner_index: selection.winner_index,
            pool_size: selection.pool_size,
            prize,
            random_word: word,
            settled_at,
        };
        pending.machine.record_draw(record.clone());

        tracing::info!(
            "Request {} settled: {} (entry {} of {}) won {} sats",
            request_id,
            record.winner,
            record.winner_index,
            record.pool_size,
            prize.to_sat()
        );

        Ok(Settlement { record, events })
    }

    /// Waits for the ledger without ever abandoning the transfer. A payout
    /// slower than `payout_warn_after` is logged and still awaited.
    async fn pay(&self, winner: &Participant, prize: Amount) -> fairdraw_core::Result<()> {
        let payout = self.ledger.payout(winner, prize);
        tokio::pin!(payout);

        tokio::select! {
            result = &mut payout => return result,
            _ = tokio::time::sleep(self.payout_warn_after) => {
                tracing::warn!(
                    "Payout of {} sats to {} still pending after {:?}",
                    prize.to_sat(),
                    winner,
                    self.payout_warn_after
                );
            }
        }

        payout.await
    }
}

/// Settlement effects not yet committed. Dropping it restores the snapshot.
struct PendingSettlement<'m> {
    machine: &'m mut RaffleStateMachine,
    snapshot: Option<Snapshot>,
}

impl<'m> PendingSettlement<'m> {
    fn begin(machine: &'m mut RaffleStateMachine) -> Self {
        let snapshot = Some(machine.snapshot());
        Self { machine, snapshot }
    }

    fn commit(&mut self) {
        self.snapshot = None;
    }
}

impl Drop for PendingSettlement<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.machine.restore(snapshot);
        }
    }
}
