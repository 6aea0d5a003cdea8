//! Error types for the deposit submitter

use std::fmt;
use thiserror::Error;

/// Failure category of a single submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Estimation,
    Affordability,
    Submission,
    ConfirmationTimeout,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Estimation => "estimation",
            ErrorKind::Affordability => "affordability",
            ErrorKind::Submission => "submission",
            ErrorKind::ConfirmationTimeout => "confirmation timeout",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Main error type for the submitter
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {network} after {attempts} attempts: {message}")]
    Connection {
        network: String,
        attempts: u32,
        message: String,
    },

    #[error("Error estimating gas: {0}")]
    GasEstimation(String),

    #[error("Error getting optimal gas price: {0}")]
    FeeEstimation(String),

    #[error("Insufficient funds. Balance: {have} ETH, Required: {need} ETH")]
    InsufficientFunds { have: String, need: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transaction error: {0}")]
    Submission(String),

    #[error("No receipt for {tx_hash} after {attempts} attempts")]
    ConfirmationTimeout { tx_hash: String, attempts: u32 },
}

impl SubmitError {
    /// Failure category used by callers to pick a reaction
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::Config(_) => ErrorKind::Config,
            SubmitError::Connection { .. } => ErrorKind::Connectivity,
            SubmitError::GasEstimation(_) | SubmitError::FeeEstimation(_) => ErrorKind::Estimation,
            SubmitError::InsufficientFunds { .. } => ErrorKind::Affordability,
            SubmitError::Wallet(_) | SubmitError::Submission(_) => ErrorKind::Submission,
            SubmitError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connectivity)
    }

    /// True when a transaction may already be on-chain
    pub fn after_submission(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfirmationTimeout)
    }
}

/// Result type for submitter operations
pub type SubmitResult<T> = Result<T, SubmitError>;
