use crate::state::RaffleState;
use fairdraw_core::{Participant, RequestId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RaffleError>;

#[derive(Error, Debug)]
pub enum RaffleError {
    #[error("fairdraw core error: {0}")]
    Core(#[from] fairdraw_core::FairdrawError),

    #[error("Insufficient stake: sent {sent} sats, entrance fee is {required} sats")]
    InsufficientStake { sent: u64, required: u64 },

    #[error("Raffle is not open")]
    RaffleNotOpen,

    #[error("Upkeep not needed: balance {balance} sats, {pool_size} participants, state {state:?}")]
    UpkeepNotNeeded {
        balance: u64,
        pool_size: usize,
        state: RaffleState,
    },

    #[error("Unknown request {received} (outstanding: {expected:?})")]
    UnknownRequest {
        expected: Option<RequestId>,
        received: RequestId,
    },

    #[error("Fulfillment for request {0} carried no random words")]
    MissingRandomWords(RequestId),

    #[error("Transfer of {amount} sats to {winner} failed: {reason}")]
    TransferFailed {
        winner: Participant,
        amount: u64,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
