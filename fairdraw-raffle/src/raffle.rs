use crate::error::{RaffleError, Result};
use crate::events::{EventBus, RaffleEvent};
use crate::settlement::{DrawRecord, SettlementCoordinator};
use crate::state::{RaffleState, RaffleStateMachine, UpkeepStatus};
use chrono::{DateTime, Utc};
use fairdraw_core::{
    Amount, Clock, FairdrawError, Fulfillment, FundsLedger, Participant, RaffleConfig,
    RandomWord, RandomnessProvider, RequestId,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// A recurring raffle wired to its clock, ledger and randomness provider.
///
/// Every operation runs under one lock, so entries, draw starts and
/// settlements are serialized against each other. Once a mutating operation
/// holds the lock it runs on its own task, so dropping the caller's future
/// never leaves a half-applied change behind.
pub struct Raffle {
    config: RaffleConfig,
    machine: Arc<Mutex<RaffleStateMachine>>,
    wiring: Wiring,
}

/// Collaborators a detached operation carries onto its task.
#[derive(Clone)]
struct Wiring {
    raffle_id: Uuid,
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn FundsLedger>,
    provider: Arc<dyn RandomnessProvider>,
    events: EventBus,
    payout_warn_after: Duration,
}

type MachineGuard = OwnedMutexGuard<RaffleStateMachine>;

/// Runs `work` to completion whether or not the caller keeps waiting.
async fn run_detached<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| RaffleError::Internal(format!("Raffle task failed: {}", e)))?
}

impl Raffle {
    pub fn new(
        config: RaffleConfig,
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn FundsLedger>,
        provider: Arc<dyn RandomnessProvider>,
    ) -> Result<Self> {
        let machine = RaffleStateMachine::new(config.clone(), clock.now())?;
        let id = Uuid::new_v4();

        tracing::info!(
            "Created raffle {} (fee {} sats, interval {:?})",
            id,
            config.entrance_fee.to_sat(),
            config.interval
        );

        Ok(Self {
            machine: Arc::new(Mutex::new(machine)),
            wiring: Wiring {
                raffle_id: id,
                clock,
                ledger,
                provider,
                events: EventBus::new(),
                payout_warn_after: config.payout_warn_after,
            },
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.wiring.raffle_id
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn entrance_fee(&self) -> Amount {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn num_words(&self) -> u32 {
        self.config.num_words()
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.vrf.request_confirmations
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.wiring.events.subscribe()
    }

    async fn lock_owned(&self) -> MachineGuard {
        self.machine.clone().lock_owned().await
    }

    /// Buy one entry with `stake`, which must cover the entrance fee.
    pub async fn enter(&self, participant: Participant, stake: Amount) -> Result<()> {
        let machine = self.lock_owned().await;
        machine.check_entry(stake)?;

        run_detached(self.wiring.clone().enter(machine, participant, stake)).await
    }

    pub async fn check_upkeep(&self) -> Result<UpkeepStatus> {
        let machine = self.machine.lock().await;
        let balance = self.wiring.ledger.balance().await?;
        let status = machine.upkeep(self.wiring.clock.now(), balance);

        tracing::debug!("Raffle {} upkeep: {:?}", self.id(), status);
        Ok(status)
    }

    /// Whether a draw may start now. No side effects.
    pub async fn is_draw_due(&self) -> Result<bool> {
        Ok(self.check_upkeep().await?.is_due())
    }

    /// Close entries and request randomness for a draw. Returns without
    /// waiting for the fulfillment.
    pub async fn start_draw(&self) -> Result<RequestId> {
        let machine = self.lock_owned().await;
        run_detached(self.wiring.clone().start_draw(machine)).await
    }

    /// Provider callback. Only the outstanding request is accepted; word 0
    /// picks the winner.
    pub async fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        random_words: Vec<RandomWord>,
    ) -> Result<DrawRecord> {
        let machine = self.lock_owned().await;

        if let Err(e) = machine.check_fulfillment(request_id) {
            tracing::warn!("Raffle {}: rejected fulfillment: {}", self.id(), e);
            return Err(e);
        }

        let word = random_words
            .first()
            .copied()
            .ok_or(RaffleError::MissingRandomWords(request_id))?;

        run_detached(self.wiring.clone().settle(machine, request_id, word)).await
    }

    /// Deliver a provider fulfillment, checking its proof when one is attached.
    pub async fn deliver(&self, fulfillment: Fulfillment) -> Result<DrawRecord> {
        if fulfillment.proof.is_some() && !fulfillment.is_verified() {
            tracing::warn!(
                "Raffle {}: proof for request {} does not verify",
                self.id(),
                fulfillment.request_id
            );
            return Err(FairdrawError::randomness(format!(
                "Proof for request {} does not verify",
                fulfillment.request_id
            ))
            .into());
        }

        self.on_randomness_fulfilled(fulfillment.request_id, fulfillment.random_words)
            .await
    }

    pub async fn state(&self) -> RaffleState {
        self.machine.lock().await.state()
    }

    pub async fn outstanding_request(&self) -> Option<RequestId> {
        self.machine.lock().await.outstanding_request()
    }

    pub async fn participant(&self, index: usize) -> Option<Participant> {
        self.machine.lock().await.participant(index).cloned()
    }

    pub async fn participant_count(&self) -> usize {
        self.machine.lock().await.participant_count()
    }

    pub async fn recent_winner(&self) -> Option<Participant> {
        self.machine.lock().await.recent_winner().cloned()
    }

    pub async fn last_draw_at(&self) -> DateTime<Utc> {
        self.machine.lock().await.last_draw_at()
    }

    pub async fn draw_history(&self) -> Vec<DrawRecord> {
        self.machine.lock().await.history().to_vec()
    }

    pub async fn get_info(&self) -> Result<RaffleInfo> {
        let machine = self.machine.lock().await;
        let balance = self.wiring.ledger.balance().await?;

        Ok(RaffleInfo {
            id: self.id(),
            entrance_fee: self.config.entrance_fee,
            interval: self.config.interval,
            state: machine.state(),
            participant_count: machine.participant_count(),
            balance,
            last_draw_at: machine.last_draw_at(),
            recent_winner: machine.recent_winner().cloned(),
            outstanding_request: machine.outstanding_request(),
            draws_completed: machine.draws_completed(),
        })
    }
}

/// Raffle info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleInfo {
    pub id: Uuid,
    pub entrance_fee: Amount,
    pub interval: Duration,
    pub state: RaffleState,
    pub participant_count: usize,
    pub balance: Amount,
    pub last_draw_at: DateTime<Utc>,
    pub recent_winner: Option<Participant>,
    pub outstanding_request: Option<RequestId>,
    pub draws_completed: u64,
}

/// Each method owns the machine guard and releases it only after its events
/// are published, so subscribers see events in lock order.
impl Wiring {
    async fn enter(
        self,
        mut machine: MachineGuard,
        participant: Participant,
        stake: Amount,
    ) -> Result<()> {
        self.ledger.deposit(&participant, stake).await?;
        machine.push_participant(participant.clone())?;

        tracing::info!(
            "Raffle {}: {} entered with {} sats ({} entries)",
            self.raffle_id,
            participant,
            stake.to_sat(),
            machine.participant_count()
        );
        self.events.publish(RaffleEvent::Entered { participant, stake });
        Ok(())
    }

    async fn start_draw(self, mut machine: MachineGuard) -> Result<RequestId> {
        let balance = self.ledger.balance().await?;
        let request = machine.begin_draw(self.clock.now(), balance)?;

        let request_id = match self.provider.request_randomness(request).await {
            Ok(request_id) => request_id,
            Err(e) => {
                machine.abort_request();
                tracing::error!("Raffle {}: randomness request failed: {}", self.raffle_id, e);
                return Err(e.into());
            }
        };
        machine.commit_request(request_id)?;

        tracing::info!(
            "Raffle {}: requested randomness {} for {} entries, {} sats",
            self.raffle_id,
            request_id,
            machine.participant_count(),
            balance.to_sat()
        );
        self.events
            .publish(RaffleEvent::DrawRequested { request_id });
        Ok(request_id)
    }

    async fn settle(
        self,
        mut machine: MachineGuard,
        request_id: RequestId,
        word: RandomWord,
    ) -> Result<DrawRecord> {
        let coordinator = SettlementCoordinator::new(
            self.ledger.as_ref(),
            self.clock.as_ref(),
            self.payout_warn_after,
        );
        let settlement = coordinator.settle(&mut *machine, request_id, word).await?;

        for event in settlement.events {
            self.events.publish(event);
        }
        Ok(settlement.record)
    }
}
