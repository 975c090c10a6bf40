use async_trait::async_trait;
use fairdraw_core::{Amount, FundsLedger, InMemoryLedger, Participant, Result};
use std::time::Duration;

/// Ledger whose payouts wait `before` ahead of the transfer and `after`
/// once it is done. Dropping a payout during `before` moves no funds.
pub(crate) struct DelayedLedger {
    pub inner: InMemoryLedger,
    before: Duration,
    after: Duration,
    deposit_delay: Duration,
}

impl DelayedLedger {
    pub fn new(before: Duration, after: Duration) -> Self {
        Self {
            inner: InMemoryLedger::new(),
            before,
            after,
            deposit_delay: Duration::ZERO,
        }
    }

    pub fn with_deposit_delay(mut self, delay: Duration) -> Self {
        self.deposit_delay = delay;
        self
    }
}

#[async_trait]
impl FundsLedger for DelayedLedger {
    async fn deposit(&self, from: &Participant, amount: Amount) -> Result<()> {
        tokio::time::sleep(self.deposit_delay).await;
        self.inner.deposit(from, amount).await
    }

    async fn balance(&self) -> Result<Amount> {
        self.inner.balance().await
    }

    async fn payout(&self, to: &Participant, amount: Amount) -> Result<()> {
        tokio::time::sleep(self.before).await;
        self.inner.payout(to, amount).await?;
        tokio::time::sleep(self.after).await;
        Ok(())
    }
}
