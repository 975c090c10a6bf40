use crate::error::{FairdrawError, Result};
use crate::ledger::{EntryKind, FundsLedger, LedgerEntry};
use crate::types::Participant;
use async_trait::async_trait;
use bitcoin::Amount;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct LedgerState {
    pot: Amount,
    paid: HashMap<Participant, Amount>,
    rejecting: HashSet<Participant>,
    entries: Vec<LedgerEntry>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            pot: Amount::ZERO,
            paid: HashMap::new(),
            rejecting: HashSet::new(),
            entries: Vec::new(),
        }
    }
}

/// Process-local ledger. Recipients can be marked as rejecting to exercise
/// failed payouts.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every future payout to `participant` fails until `accept_payouts_to`.
    pub fn reject_payouts_to(&self, participant: Participant) {
        tracing::debug!("Ledger will reject payouts to {}", participant);
        self.state.write().rejecting.insert(participant);
    }

    pub fn accept_payouts_to(&self, participant: &Participant) {
        self.state.write().rejecting.remove(participant);
    }

    pub fn pot(&self) -> Amount {
        self.state.read().pot
    }

    /// Total paid out to `participant` so far.
    pub fn paid_to(&self, participant: &Participant) -> Amount {
        self.state
            .read()
            .paid
            .get(participant)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().entries.clone()
    }
}

#[async_trait]
impl FundsLedger for InMemoryLedger {
    async fn deposit(&self, from: &Participant, amount: Amount) -> Result<()> {
        if amount == Amount::ZERO {
            return Err(FairdrawError::invalid_amount("Deposit must be greater than 0"));
        }

        let mut state = self.state.write();
        state.pot = state
            .pot
            .checked_add(amount)
            .ok_or_else(|| FairdrawError::invalid_amount("Pot overflow"))?;
        state.entries.push(LedgerEntry {
            kind: EntryKind::Deposit,
            participant: from.clone(),
            amount,
            timestamp: Utc::now(),
        });

        tracing::debug!("Deposited {} sats from {}", amount.to_sat(), from);
        Ok(())
    }

    async fn balance(&self) -> Result<Amount> {
        Ok(self.state.read().pot)
    }

    async fn payout(&self, to: &Participant, amount: Amount) -> Result<()> {
        let mut state = self.state.write();

        if state.rejecting.contains(to) {
            return Err(FairdrawError::transfer(format!(
                "Recipient {} rejected payout of {} sats",
                to,
                amount.to_sat()
            )));
        }

        let remaining = state
            .pot
            .checked_sub(amount)
            .ok_or(FairdrawError::InsufficientFunds {
                need: amount.to_sat(),
                available: state.pot.to_sat(),
            })?;

        state.pot = remaining;
        *state.paid.entry(to.clone()).or_insert(Amount::ZERO) += amount;
        state.entries.push(LedgerEntry {
            kind: EntryKind::Payout,
            participant: to.clone(),
            amount,
            timestamp: Utc::now(),
        });

        tracing::info!("Paid {} sats to {}", amount.to_sat(), to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deposit_and_payout() {
        let ledger = InMemoryLedger::new();
        let alice = Participant::from("alice");
        let bob = Participant::from("bob");

        ledger.deposit(&alice, Amount::from_sat(1_000)).await.unwrap();
        ledger.deposit(&bob, Amount::from_sat(1_000)).await.unwrap();
        assert_eq!(ledger.balance().await.unwrap(), Amount::from_sat(2_000));

        ledger.payout(&bob, Amount::from_sat(2_000)).await.unwrap();
        assert_eq!(ledger.balance().await.unwrap(), Amount::ZERO);
        assert_eq!(ledger.paid_to(&bob), Amount::from_sat(2_000));
        assert_eq!(ledger.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_payout_moves_nothing() {
        let ledger = InMemoryLedger::new();
        let alice = Participant::from("alice");

        ledger.deposit(&alice, Amount::from_sat(500)).await.unwrap();
        ledger.reject_payouts_to(alice.clone());

        let result = ledger.payout(&alice, Amount::from_sat(500)).await;
        assert!(matches!(result, Err(FairdrawError::Transfer(_))));
        assert_eq!(ledger.pot(), Amount::from_sat(500));
        assert_eq!(ledger.paid_to(&alice), Amount::ZERO);

        ledger.accept_payouts_to(&alice);
        ledger.payout(&alice, Amount::from_sat(500)).await.unwrap();
        assert_eq!(ledger.paid_to(&alice), Amount::from_sat(500));
    }

    #[tokio::test]
    async fn test_payout_above_pot_fails() {
        let ledger = InMemoryLedger::new();
        let alice = Participant::from("alice");

        ledger.deposit(&alice, Amount::from_sat(100)).await.unwrap();
        let result = ledger.payout(&alice, Amount::from_sat(101)).await;
        assert!(matches!(
            result,
            Err(FairdrawError::InsufficientFunds {
                need: 101,
                available: 100
            })
        ));
    }

    #[tokio::test]
    async fn test_zero_deposit_rejected() {
        let ledger = InMemoryLedger::new();
        let result = ledger.deposit(&Participant::from("alice"), Amount::ZERO).await;
        assert!(matches!(result, Err(FairdrawError::InvalidAmount(_))));
    }
}
