pub mod commitment;
pub mod provider;

pub use commitment::{CommitmentScheme, Sha256Commitment};
pub use provider::CommitRevealProvider;

use crate::error::Result;
use crate::types::{RandomWord, RequestId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on words per request.
pub const MAX_NUM_WORDS: u32 = 500;

/// Parameters sent to the provider with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub key_hash: String,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub subscription_id: u64,
    pub num_words: u32,
}

/// Accepts randomness requests. The answer arrives later, out of band, as a
/// [`Fulfillment`] carrying the returned id.
#[async_trait]
pub trait RandomnessProvider: Send + Sync {
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId>;
}

/// Seed revealed by the provider, checkable against the commitment it
/// published when the request was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessProof {
    pub commitment: [u8; 32],
    pub seed: [u8; 32],
}

impl RandomnessProof {
    pub fn verify(&self, request_id: RequestId, words: &[RandomWord]) -> bool {
        if words.is_empty() || !Sha256Commitment::verify(&self.commitment, &self.seed) {
            return false;
        }
        derive_words(&self.seed, request_id, words.len() as u32) == words
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub request_id: RequestId,
    pub random_words: Vec<RandomWord>,
    pub proof: Option<RandomnessProof>,
}

impl Fulfillment {
    pub fn new(request_id: RequestId, random_words: Vec<RandomWord>) -> Self {
        Self {
            request_id,
            random_words,
            proof: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.proof
            .as_ref()
            .map_or(false, |proof| proof.verify(self.request_id, &self.random_words))
    }
}

/// word[i] = SHA-256(seed || request_id as BE u64 || i as BE u32)
pub fn derive_words(seed: &[u8; 32], request_id: RequestId, num_words: u32) -> Vec<RandomWord> {
    (0..num_words)
        .map(|index| {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(request_id.value().to_be_bytes());
            hasher.update(index.to_be_bytes());
            RandomWord::from_bytes(hasher.finalize().into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_words_is_deterministic() {
        let seed = [7u8; 32];
        let first = derive_words(&seed, RequestId::new(1), 2);
        assert_eq!(first, derive_words(&seed, RequestId::new(1), 2));
        assert_ne!(first[0], first[1]);
        assert_ne!(first, derive_words(&seed, RequestId::new(2), 2));
    }

    #[test]
    fn test_proof_verification() {
        let seed = [42u8; 32];
        let proof = RandomnessProof {
            commitment: Sha256Commitment::commit(&seed),
            seed,
        };
        let id = RequestId::new(3);
        let words = derive_words(&seed, id, 1);

        assert!(proof.verify(id, &words));
        assert!(!proof.verify(RequestId::new(4), &words));
        assert!(!proof.verify(id, &[RandomWord::from(1)]));
        assert!(!proof.verify(id, &[]));

        let forged = RandomnessProof {
            commitment: [0u8; 32],
            seed,
        };
        assert!(!forged.verify(id, &words));
    }
}
