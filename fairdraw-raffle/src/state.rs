use crate::error::{RaffleError, Result};
use crate::settlement::{DrawRecord, Selection};
use chrono::{DateTime, Utc};
use fairdraw_core::{Amount, Participant, RaffleConfig, RandomWord, RandomnessRequest, RequestId};
use serde::{Deserialize, Serialize};

/// Completed draws kept in memory. Older records are dropped first.
pub const HISTORY_LIMIT: usize = 1024;

/// Externally visible raffle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaffleState {
    Open,
    Calculating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    /// Provider call in flight. Only exists while the raffle lock is held.
    Requesting,
    Calculating {
        request_id: RequestId,
    },
}

/// Result of evaluating whether a draw may start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpkeepStatus {
    pub state: RaffleState,
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
    pub balance: Amount,
    pub pool_size: usize,
}

impl UpkeepStatus {
    pub fn is_due(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }

    fn not_needed(&self) -> RaffleError {
        RaffleError::UpkeepNotNeeded {
            balance: self.balance.to_sat(),
            pool_size: self.pool_size,
            state: self.state,
        }
    }
}

/// Fields a settlement may touch, captured before it starts.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    phase: Phase,
    participants: Vec<Participant>,
    last_draw_at: DateTime<Utc>,
    recent_winner: Option<Participant>,
    history_len: usize,
}

/// Participant pool, timing and the open/calculating cycle of a raffle.
///
/// This type does no I/O. Callers supply the current time and ledger
/// balance, and serialize access to it.
#[derive(Debug)]
pub struct RaffleStateMachine {
    config: RaffleConfig,
    interval: chrono::Duration,
    phase: Phase,
    participants: Vec<Participant>,
    last_draw_at: DateTime<Utc>,
    recent_winner: Option<Participant>,
    history: Vec<DrawRecord>,
    draws_completed: u64,
}

impl RaffleStateMachine {
    pub fn new(config: RaffleConfig, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let interval = config.interval_duration()?;

        Ok(Self {
            config,
            interval,
            phase: Phase::Open,
            participants: Vec::new(),
            last_draw_at: now,
            recent_winner: None,
            history: Vec::new(),
            draws_completed: 0,
        })
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn entrance_fee(&self) -> Amount {
        self.config.entrance_fee
    }

    pub fn state(&self) -> RaffleState {
        match self.phase {
            Phase::Open => RaffleState::Open,
            Phase::Requesting | Phase::Calculating { .. } => RaffleState::Calculating,
        }
    }

    pub fn outstanding_request(&self) -> Option<RequestId> {
        match self.phase {
            Phase::Calculating { request_id } => Some(request_id),
            _ => None,
        }
    }

    pub fn participant(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn recent_winner(&self) -> Option<&Participant> {
        self.recent_winner.as_ref()
    }

    pub fn last_draw_at(&self) -> DateTime<Utc> {
        self.last_draw_at
    }

    /// The most recent draws, oldest first, at most [`HISTORY_LIMIT`] of them.
    pub fn history(&self) -> &[DrawRecord] {
        &self.history
    }

    /// Checks an entry without recording it.
    pub fn check_entry(&self, stake: Amount) -> Result<()> {
        if stake < self.config.entrance_fee {
            return Err(RaffleError::InsufficientStake {
                sent: stake.to_sat(),
                required: self.config.entrance_fee.to_sat(),
            });
        }

        if self.phase != Phase::Open {
            return Err(RaffleError::RaffleNotOpen);
        }

        Ok(())
    }

    pub fn push_participant(&mut self, participant: Participant) -> Result<()> {
        if self.phase != Phase::Open {
            return Err(RaffleError::RaffleNotOpen);
        }
        self.participants.push(participant);
        Ok(())
    }

    pub fn upkeep(&self, now: DateTime<Utc>, balance: Amount) -> UpkeepStatus {
        UpkeepStatus {
            state: self.state(),
            is_open: self.phase == Phase::Open,
            time_passed: now - self.last_draw_at >= self.interval,
            has_players: !self.participants.is_empty(),
            has_balance: balance > Amount::ZERO,
            balance,
            pool_size: self.participants.len(),
        }
    }

    /// Leaves `Open` ahead of the provider call and returns the request to send.
    pub fn begin_draw(&mut self, now: DateTime<Utc>, balance: Amount) -> Result<RandomnessRequest> {
        let status = self.upkeep(now, balance);
        if !status.is_due() {
            return Err(status.not_needed());
        }

        self.phase = Phase::Requesting;
        Ok(self.config.randomness_request())
    }

    pub fn commit_request(&mut self, request_id: RequestId) -> Result<()> {
        if self.phase != Phase::Requesting {
            return Err(RaffleError::Internal(format!(
                "No draw in flight to attach request {} to",
                request_id
            )));
        }
        self.phase = Phase::Calculating { request_id };
        Ok(())
    }

    /// Back to `Open` after the provider refused the request.
    pub fn abort_request(&mut self) {
        if self.phase == Phase::Requesting {
            self.phase = Phase::Open;
        }
    }

    pub fn check_fulfillment(&self, request_id: RequestId) -> Result<()> {
        match self.phase {
            Phase::Calculating { request_id: expected } if expected == request_id => Ok(()),
            _ => Err(RaffleError::UnknownRequest {
                expected: self.outstanding_request(),
                received: request_id,
            }),
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            participants: self.participants.clone(),
            last_draw_at: self.last_draw_at,
            recent_winner: self.recent_winner.clone(),
            history_len: self.history.len(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.phase = snapshot.phase;
        self.participants = snapshot.participants;
        self.last_draw_at = snapshot.last_draw_at;
        self.recent_winner = snapshot.recent_winner;
        self.history.truncate(snapshot.history_len);
    }

    /// Picks `word mod pool_size`, records the winner, clears the pool and
    /// reopens. Nothing is paid here.
    pub(crate) fn apply_settlement(
        &mut self,
        request_id: RequestId,
        word: RandomWord,
        now: DateTime<Utc>,
    ) -> Result<Selection> {
        self.check_fulfillment(request_id)?;

        let pool_size = self.participants.len();
        let winner_index = word
            .reduce(pool_size)
            .ok_or_else(|| RaffleError::Internal("Settling an empty pool".to_string()))?;
        let winner = self.participants[winner_index].clone();

        self.recent_winner = Some(winner.clone());
        self.participants.clear();
        self.phase = Phase::Open;
        self.last_draw_at = now;

        Ok(Selection {
            winner,
            winner_index,
            pool_size,
        })
    }

    /// Total settled draws, including those trimmed from `history`.
    pub fn draws_completed(&self) -> u64 {
        self.draws_completed
    }

    pub(crate) fn record_draw(&mut self, record: DrawRecord) {
        if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(record);
        self.draws_completed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn machine() -> (RaffleStateMachine, DateTime<Utc>) {
        let start = Utc::now();
        let config = RaffleConfig::new(Amount::from_sat(1_000), Duration::from_secs(30));
        (RaffleStateMachine::new(config, start).unwrap(), start)
    }

    #[test]
    fn test_upkeep_conditions() {
        let (mut machine, start) = machine();
        let later = start + chrono::Duration::seconds(30);
        let balance = Amount::from_sat(1_000);

        assert!(!machine.upkeep(later, balance).has_players);
        machine.push_participant(Participant::from("alice")).unwrap();

        let status = machine.upkeep(start + chrono::Duration::seconds(29), balance);
        assert!(!status.time_passed);
        assert!(!status.is_due());

        assert!(!machine.upkeep(later, Amount::ZERO).is_due());
        assert!(machine.upkeep(later, balance).is_due());
    }

    #[test]
    fn test_begin_and_abort_draw() {
        let (mut machine, start) = machine();
        let later = start + chrono::Duration::seconds(60);
        machine.push_participant(Participant::from("alice")).unwrap();

        let request = machine.begin_draw(later, Amount::from_sat(1_000)).unwrap();
        assert_eq!(request.num_words, 1);
        assert_eq!(machine.state(), RaffleState::Calculating);
        assert_eq!(machine.outstanding_request(), None);
        assert!(matches!(
            machine.push_participant(Participant::from("bob")),
            Err(RaffleError::RaffleNotOpen)
        ));

        machine.abort_request();
        assert_eq!(machine.state(), RaffleState::Open);
        assert_eq!(machine.participant_count(), 1);
    }

    #[test]
    fn test_commit_request_requires_draw_in_flight() {
        let (mut machine, _) = machine();
        assert!(matches!(
            machine.commit_request(RequestId::new(1)),
            Err(RaffleError::Internal(_))
        ));
        assert_eq!(machine.outstanding_request(), None);
    }

    #[test]
    fn test_snapshot_restore() {
        let (mut machine, start) = machine();
        let later = start + chrono::Duration::seconds(60);
        for name in ["a", "b", "c"] {
            machine.push_participant(Participant::from(name)).unwrap();
        }
        machine.begin_draw(later, Amount::from_sat(3_000)).unwrap();
        machine.commit_request(RequestId::new(9)).unwrap();

        let snapshot = machine.snapshot();
        let selection = machine
            .apply_settlement(RequestId::new(9), RandomWord::from(7), later)
            .unwrap();
        assert_eq!(selection.winner, Participant::from("b"));
        assert_eq!(selection.winner_index, 1);
        assert_eq!(machine.state(), RaffleState::Open);
        assert_eq!(machine.participant_count(), 0);

        machine.restore(snapshot);
        assert_eq!(machine.state(), RaffleState::Calculating);
        assert_eq!(machine.outstanding_request(), Some(RequestId::new(9)));
        assert_eq!(machine.participant_count(), 3);
        assert_eq!(machine.last_draw_at(), start);
        assert_eq!(machine.recent_winner(), None);
    }

    #[test]
    fn test_history_is_capped() {
        let (mut machine, start) = machine();
        let total = HISTORY_LIMIT as u64 + 5;
        for i in 0..total {
            machine.record_draw(DrawRecord {
                request_id: RequestId::new(i),
                winner: Participant::from("a"),
                winner_index: 0,
                pool_size: 1,
                prize: Amount::from_sat(1_000),
                random_word: RandomWord::from(i),
                settled_at: start,
            });
        }

        assert_eq!(machine.history().len(), HISTORY_LIMIT);
        assert_eq!(machine.draws_completed(), total);
        assert_eq!(machine.history()[0].request_id, RequestId::new(5));
        assert_eq!(
            machine.history().last().map(|record| record.request_id),
            Some(RequestId::new(total - 1))
        );
    }

    #[test]
    fn test_settlement_rejects_wrong_request() {
        let (mut machine, start) = machine();
        machine.push_participant(Participant::from("a")).unwrap();
        let later = start + chrono::Duration::seconds(60);
        machine.begin_draw(later, Amount::from_sat(1_000)).unwrap();
        machine.commit_request(RequestId::new(2)).unwrap();

        let result = machine.apply_settlement(RequestId::new(3), RandomWord::from(0), later);
        assert!(matches!(
            result,
            Err(RaffleError::UnknownRequest {
                expected: Some(_),
                ..
            })
        ));
        assert_eq!(machine.participant_count(), 1);
        assert_eq!(machine.outstanding_request(), Some(RequestId::new(2)));
    }
}
