use crate::types::RequestId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FairdrawError>;

#[derive(Error, Debug)]
pub enum FairdrawError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Insufficient funds: need {need} sats, have {available} sats")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Randomness provider error: {0}")]
    Randomness(String),

    #[error("Unknown randomness request: {0}")]
    UnknownRequest(RequestId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FairdrawError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    pub fn randomness(msg: impl Into<String>) -> Self {
        Self::Randomness(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }
}
