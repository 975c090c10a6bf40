use sha2::{Digest, Sha256};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Secret: ?Sized;
    type Commitment;

    fn commit(secret: &Self::Secret) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, secret: &Self::Secret) -> bool;
}

/// Hash based commitment impl
#[derive(Debug, Clone, Copy)]
pub struct Sha256Commitment;

impl CommitmentScheme for Sha256Commitment {
    type Secret = [u8; 32];
    type Commitment = [u8; 32];

    fn commit(secret: &Self::Secret) -> Self::Commitment {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.finalize().into()
    }

    fn verify(commitment: &Self::Commitment, secret: &Self::Secret) -> bool {
        Self::commit(secret) == *commitment
    }
}

/// Rnd secret for commitment
pub fn generate_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut seed);
    seed
}
