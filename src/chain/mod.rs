//! Chain module - the JSON-RPC surface the submitter consumes
//!
//! `ChainClient` is the seam between the submitter and the node, so the
//! submission workflow can be driven against a mock in tests.

pub mod provider;

pub use provider::ChainProvider;

use crate::error::SubmitResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Cheap request used to check the endpoint is reachable
    async fn block_number(&self) -> SubmitResult<u64>;

    /// Base fee per gas of the latest block
    async fn latest_base_fee(&self) -> SubmitResult<U256>;

    /// Account nonce as counted by the node
    async fn transaction_count(&self, address: Address) -> SubmitResult<U256>;

    async fn balance(&self, address: Address) -> SubmitResult<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitResult<U256>;

    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitResult<H256>;

    async fn transaction_receipt(&self, tx_hash: H256) -> SubmitResult<Option<TransactionReceipt>>;
}
