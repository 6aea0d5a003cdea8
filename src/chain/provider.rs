//! HTTP JSON-RPC provider for a single network

use super::ChainClient;
use crate::config::NetworkConfig;
use crate::error::{SubmitError, SubmitResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;
use tracing::debug;

/// ethers HTTP provider bound to one network
pub struct ChainProvider {
    network: String,
    provider: Provider<Http>,
}

impl ChainProvider {
    /// Create a provider. No request is made until the first call.
    pub fn new(config: &NetworkConfig) -> SubmitResult<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| SubmitError::Config(format!("Invalid RPC URL {}: {}", config.rpc_url, e)))?
            .interval(Duration::from_millis(500));

        debug!("Created HTTP provider for {}: {}", config.name, config.rpc_url);

        Ok(Self {
            network: config.name.clone(),
            provider,
        })
    }

    fn connection_error(&self, e: impl std::fmt::Display) -> SubmitError {
        SubmitError::Connection {
            network: self.network.clone(),
            attempts: 1,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ChainClient for ChainProvider {
    async fn block_number(&self) -> SubmitResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|b| b.as_u64())
            .map_err(|e| self.connection_error(e))
    }

    async fn latest_base_fee(&self) -> SubmitResult<U256> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| SubmitError::FeeEstimation(e.to_string()))?
            .ok_or_else(|| SubmitError::FeeEstimation("No latest block".to_string()))?;

        block
            .base_fee_per_gas
            .ok_or_else(|| SubmitError::FeeEstimation("No base fee in block".to_string()))
    }

    async fn transaction_count(&self, address: Address) -> SubmitResult<U256> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| SubmitError::Submission(format!("Failed to fetch nonce: {}", e)))
    }

    async fn balance(&self, address: Address) -> SubmitResult<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| self.connection_error(e))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> SubmitResult<U256> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(|e| SubmitError::GasEstimation(e.to_string()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> SubmitResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| SubmitError::Submission(e.to_string()))?;
        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> SubmitResult<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| self.connection_error(e))
    }
}
