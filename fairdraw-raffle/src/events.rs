use fairdraw_core::{Amount, Participant, RequestId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Notifications emitted once per causing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaffleEvent {
    Entered {
        participant: Participant,
        stake: Amount,
    },
    DrawRequested {
        request_id: RequestId,
    },
    WinnerPicked {
        winner: Participant,
        prize: Amount,
    },
}

/// Broadcast fan-out of raffle events. Clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RaffleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: RaffleEvent) {
        tracing::debug!("Publishing {:?}", event);
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
