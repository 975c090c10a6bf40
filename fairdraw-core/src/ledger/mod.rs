pub mod memory;

pub use memory::InMemoryLedger;

use crate::error::Result;
use crate::types::Participant;
use async_trait::async_trait;
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Holds deposited stakes and pays out prizes.
#[async_trait]
pub trait FundsLedger: Send + Sync {
    /// Credit `amount` from `from` to the pot.
    async fn deposit(&self, from: &Participant, amount: Amount) -> Result<()>;

    /// Total currently held in the pot.
    async fn balance(&self) -> Result<Amount>;

    /// Transfer `amount` from the pot to `to`. A failed payout moves no funds.
    ///
    /// Must finish in bounded time: callers wait for the result and never
    /// retry. Implementations must also be cancel-safe, so a payout future
    /// dropped before it resolves moves no funds.
    async fn payout(&self, to: &Participant, amount: Amount) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Deposit,
    Payout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub participant: Participant,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}
