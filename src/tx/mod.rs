//! Deposit transaction submission: fee and gas estimation, signing, and
//! receipt confirmation

mod gas;
mod sender;

pub use gas::{FeeQuote, FeeSource, GasEstimator};
pub use sender::DepositSubmitter;

use crate::error::SubmitResult;

use async_trait::async_trait;
use ethers::types::{TransactionReceipt, H256};
use std::fmt;

/// Final status reported for a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failed,
    /// No receipt within the polling window, or a receipt without status
    Pending,
}

impl TxStatus {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        match receipt.status.map(|s| s.as_u64()) {
            Some(1) => TxStatus::Success,
            Some(0) => TxStatus::Failed,
            _ => TxStatus::Pending,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Success => f.write_str("SUCCESS"),
            TxStatus::Failed => f.write_str("FAILED"),
            TxStatus::Pending => f.write_str("PENDING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: H256,
    pub status: TxStatus,
}

/// One complete deposit attempt, as seen by the run loop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Deposit: Send + Sync {
    async fn submit(&self) -> SubmitResult<TxOutcome>;
}
