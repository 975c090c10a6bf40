//! fairdraw core - collaborator contracts for verifiably-fair raffles
//!
//! This crate defines the pieces a raffle relies on but does not own: the
//! clock, the funds ledger and the randomness provider, together with
//! in-process implementations of each and the shared value types.

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod randomness;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RaffleConfig, VrfRequestParams, NUM_WORDS};
pub use error::{FairdrawError, Result};
pub use ledger::{FundsLedger, InMemoryLedger, LedgerEntry};
pub use randomness::{
    CommitRevealProvider, Fulfillment, RandomnessProof, RandomnessProvider, RandomnessRequest,
};
pub use types::{Participant, RandomWord, RequestId};

pub use ::bitcoin::Amount;
