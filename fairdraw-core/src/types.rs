use crate::error::{FairdrawError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a raffle participant (usually a receiving address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Participant {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Participant {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier the randomness provider assigns to an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 256-bit random value, big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomWord([u8; 32]);

impl RandomWord {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `self mod modulus` over the full 256-bit value. `None` for a zero modulus.
    pub fn reduce(&self, modulus: usize) -> Option<usize> {
        if modulus == 0 {
            return None;
        }

        let modulus = modulus as u128;
        let remainder = self
            .0
            .iter()
            .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % modulus);

        Some(remainder as usize)
    }
}

impl From<u64> for RandomWord {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for RandomWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for RandomWord {
    type Err = FairdrawError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| FairdrawError::randomness(format!("Invalid random word hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            FairdrawError::randomness(format!("Random word must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}
