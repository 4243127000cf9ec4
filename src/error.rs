use std::time::Duration;
use thiserror::Error;

/// Errors raised by a chain adapter. All of them are per-cycle failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC failure: {0}")]
    Rpc(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

impl ChainError {
    /// Transient errors are expected to clear up by the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rpc(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Rpc(format!("malformed response: {}", e))
        } else if e.is_status() {
            Self::Rpc(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification rejected by API: {0}")]
    Api(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Fatal startup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Key derivation failed: {0}")]
    Derivation(#[from] alloy::signers::local::LocalSignerError),

    #[error("Invalid address {0}")]
    InvalidAddress(String),
}
