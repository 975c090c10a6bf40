//! Recurring raffle with provider-supplied randomness
//!
//! Participants enter with a fixed stake while the raffle is open. Once the
//! interval has passed a draw closes entries and requests one random word;
//! its fulfillment picks a winner, resets the pool and pays out the whole pot
//! as a single all-or-nothing settlement.

pub mod error;
pub mod events;
pub mod keeper;
pub mod raffle;
pub mod settlement;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{RaffleError, Result};
pub use events::{EventBus, RaffleEvent};
pub use keeper::Keeper;
pub use raffle::{Raffle, RaffleInfo};
pub use settlement::{DrawRecord, Settlement, SettlementCoordinator};
pub use state::{RaffleState, RaffleStateMachine, UpkeepStatus, HISTORY_LIMIT};
