use crate::error::{FairdrawError, Result};
use crate::randomness::RandomnessRequest;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Words requested per draw. Only word 0 is used to pick a winner.
pub const NUM_WORDS: u32 = 1;

/// Parameters for a draw. Fixed at construction and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleConfig {
    pub entrance_fee: Amount,
    pub interval: Duration,
    pub vrf: VrfRequestParams,
    /// A payout still pending after this long is logged. It is never cancelled.
    pub payout_warn_after: Duration,
}

/// Provider-specific parameters forwarded with every randomness request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfRequestParams {
    pub key_hash: String, // hex, 32 bytes
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub subscription_id: u64,
}

impl Default for VrfRequestParams {
    fn default() -> Self {
        Self {
            key_hash: "474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"
                .to_string(),
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            subscription_id: 0,
        }
    }
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entrance_fee: Amount::from_sat(10_000),
            interval: Duration::from_secs(30),
            vrf: VrfRequestParams::default(),
            payout_warn_after: Duration::from_secs(10),
        }
    }
}

impl RaffleConfig {
    pub fn new(entrance_fee: Amount, interval: Duration) -> Self {
        Self {
            entrance_fee,
            interval,
            ..Self::default()
        }
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    /// The interval as a signed duration for timestamp arithmetic.
    pub fn interval_duration(&self) -> Result<chrono::Duration> {
        chrono::Duration::from_std(self.interval)
            .map_err(|e| FairdrawError::config(format!("Interval out of range: {}", e)))
    }

    pub fn randomness_request(&self) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: self.vrf.key_hash.clone(),
            request_confirmations: self.vrf.request_confirmations,
            callback_gas_limit: self.vrf.callback_gas_limit,
            subscription_id: self.vrf.subscription_id,
            num_words: NUM_WORDS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let key_hash = hex::decode(self.vrf.key_hash.trim_start_matches("0x"))
            .map_err(|e| FairdrawError::config(format!("Key hash is not valid hex: {}", e)))?;
        if key_hash.len() != 32 {
            return Err(FairdrawError::config(format!(
                "Key hash must be 32 bytes, got {}",
                key_hash.len()
            )));
        }

        if self.interval.is_zero() {
            return Err(FairdrawError::config("Draw interval must be greater than 0"));
        }
        self.interval_duration()?;

        if self.vrf.request_confirmations == 0 {
            return Err(FairdrawError::config(
                "Request confirmations must be greater than 0",
            ));
        }

        if self.vrf.callback_gas_limit == 0 {
            return Err(FairdrawError::config(
                "Callback gas limit must be greater than 0",
            ));
        }

        if self.payout_warn_after.is_zero() {
            return Err(FairdrawError::config(
                "Payout warning threshold must be greater than 0",
            ));
        }

        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_string_pretty(self)?).await?;
        Ok(())
    }
}
