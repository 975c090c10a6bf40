use crate::error::{FairdrawError, Result};
use crate::randomness::commitment::{generate_seed, CommitmentScheme, Sha256Commitment};
use crate::randomness::{
    derive_words, Fulfillment, RandomnessProof, RandomnessProvider, RandomnessRequest,
    MAX_NUM_WORDS,
};
use crate::types::RequestId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct PendingRequest {
    request: RandomnessRequest,
    seed: [u8; 32],
    commitment: [u8; 32],
    requested_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ProviderState {
    next_id: u64,
    pending: HashMap<RequestId, PendingRequest>,
    delivered: HashMap<RequestId, Fulfillment>,
}

/// In-process provider that commits to a secret seed when a request is
/// accepted and reveals it with the fulfillment.
///
/// Each request id is fulfilled at most once. Ids are sequential from 1.
#[derive(Debug)]
pub struct CommitRevealProvider {
    state: Mutex<ProviderState>,
}

impl CommitRevealProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                next_id: 1,
                pending: HashMap::new(),
                delivered: HashMap::new(),
            }),
        }
    }

    /// Commitment published for an accepted request.
    pub fn commitment(&self, request_id: RequestId) -> Option<[u8; 32]> {
        let state = self.state.lock();
        state
            .pending
            .get(&request_id)
            .map(|pending| pending.commitment)
            .or_else(|| {
                state
                    .delivered
                    .get(&request_id)
                    .and_then(|f| f.proof.as_ref().map(|p| p.commitment))
            })
    }

    /// Outstanding request ids, oldest first.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self.state.lock().pending.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Reveal the seed for `request_id` and produce its fulfillment.
    pub fn fulfill(&self, request_id: RequestId) -> Result<Fulfillment> {
        let mut state = self.state.lock();
        let pending = state
            .pending
            .remove(&request_id)
            .ok_or(FairdrawError::UnknownRequest(request_id))?;

        let fulfillment = Fulfillment {
            request_id,
            random_words: derive_words(&pending.seed, request_id, pending.request.num_words),
            proof: Some(RandomnessProof {
                commitment: pending.commitment,
                seed: pending.seed,
            }),
        };
        state.delivered.insert(request_id, fulfillment.clone());

        tracing::info!(
            "Fulfilled randomness request {} ({} words, requested at {})",
            request_id,
            pending.request.num_words,
            pending.requested_at
        );
        Ok(fulfillment)
    }

    /// A fulfillment that was already delivered, for manual re-submission.
    pub fn replay(&self, request_id: RequestId) -> Option<Fulfillment> {
        self.state.lock().delivered.get(&request_id).cloned()
    }
}

impl Default for CommitRevealProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RandomnessProvider for CommitRevealProvider {
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId> {
        if request.num_words == 0 || request.num_words > MAX_NUM_WORDS {
            return Err(FairdrawError::randomness(format!(
                "Number of words must be between 1 and {}, got {}",
                MAX_NUM_WORDS, request.num_words
            )));
        }

        if request.request_confirmations == 0 {
            return Err(FairdrawError::randomness(
                "Request confirmations must be greater than 0",
            ));
        }

        let seed = generate_seed();
        let commitment = Sha256Commitment::commit(&seed);

        let mut state = self.state.lock();
        let request_id = RequestId::new(state.next_id);
        state.next_id += 1;
        state.pending.insert(
            request_id,
            PendingRequest {
                request,
                seed,
                commitment,
                requested_at: Utc::now(),
            },
        );

        tracing::info!(
            "Accepted randomness request {} with commitment {}",
            request_id,
            hex::encode(commitment)
        );
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaffleConfig;

    #[tokio::test]
    async fn test_request_and_fulfill_once() {
        let provider = CommitRevealProvider::new();
        let request = RaffleConfig::default().randomness_request();

        let first = provider.request_randomness(request.clone()).await.unwrap();
        let second = provider.request_randomness(request).await.unwrap();
        assert_eq!(first, RequestId::new(1));
        assert_eq!(second, RequestId::new(2));
        assert_eq!(provider.pending_requests(), vec![first, second]);

        let commitment = provider.commitment(first).unwrap();
        let fulfillment = provider.fulfill(first).unwrap();
        assert_eq!(fulfillment.random_words.len(), 1);
        assert!(fulfillment.is_verified());
        assert_eq!(fulfillment.proof.as_ref().unwrap().commitment, commitment);

        assert!(matches!(
            provider.fulfill(first),
            Err(FairdrawError::UnknownRequest(id)) if id == first
        ));
        assert_eq!(provider.replay(first), Some(fulfillment));
        assert_eq!(provider.pending_requests(), vec![second]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_requests() {
        let provider = CommitRevealProvider::new();
        let mut request = RaffleConfig::default().randomness_request();
        request.num_words = 0;
        assert!(provider.request_randomness(request.clone()).await.is_err());

        request.num_words = MAX_NUM_WORDS + 1;
        assert!(provider.request_randomness(request.clone()).await.is_err());

        request.num_words = 1;
        request.request_confirmations = 0;
        assert!(provider.request_randomness(request).await.is_err());
        assert!(provider.pending_requests().is_empty());
    }
}
