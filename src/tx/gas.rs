//! Gas limit and EIP-1559 fee estimation

use crate::chain::ChainClient;
use crate::config::SubmitterConfig;

use ethers::types::U256;
use tracing::{debug, error};

/// Where a fee quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    LatestBlock,
    Fallback,
}

/// EIP-1559 fee pair for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub source: FeeSource,
}

/// Gas estimator for deposit transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 5 = 5% buffer)
    gas_limit_buffer_percent: u64,
    /// Base fee multiplier in percent (e.g., 110 = 1.1x)
    base_fee_multiplier_percent: u64,
    priority_fee: U256,
    fallback_max_fee: U256,
}

impl GasEstimator {
    pub fn new(config: &SubmitterConfig) -> Self {
        Self {
            gas_limit_buffer_percent: config.gas_limit_buffer_percent,
            base_fee_multiplier_percent: config.base_fee_multiplier_percent,
            priority_fee: U256::from(config.priority_fee_wei),
            fallback_max_fee: U256::from(config.fallback_max_fee_wei),
        }
    }

    /// Apply the safety margin to a node gas estimate, truncating
    pub fn gas_limit(&self, estimate: U256) -> U256 {
        estimate * U256::from(100 + self.gas_limit_buffer_percent) / 100
    }

    /// Fee quote derived from a base fee: floor(base * multiplier) + priority
    pub fn fee_from_base(&self, base_fee: U256) -> FeeQuote {
        let max_fee = base_fee * U256::from(self.base_fee_multiplier_percent) / 100;
        FeeQuote {
            max_fee_per_gas: max_fee + self.priority_fee,
            max_priority_fee_per_gas: self.priority_fee,
            source: FeeSource::LatestBlock,
        }
    }

    pub fn fallback_fee(&self) -> FeeQuote {
        FeeQuote {
            max_fee_per_gas: self.fallback_max_fee,
            max_priority_fee_per_gas: self.priority_fee,
            source: FeeSource::Fallback,
        }
    }

    /// Quote fees from the latest block, falling back to fixed defaults
    pub async fn quote<C: ChainClient + ?Sized>(&self, client: &C) -> FeeQuote {
        match client.latest_base_fee().await {
            Ok(base_fee) => {
                let quote = self.fee_from_base(base_fee);
                debug!("Base fee {} wei -> {:?}", base_fee, quote);
                quote
            }
            Err(e) => {
                error!("{}", e);
                self.fallback_fee()
            }
        }
    }

    /// Worst-case gas cost in wei
    pub fn calculate_cost(gas_limit: U256, fee: &FeeQuote) -> U256 {
        gas_limit * fee.max_fee_per_gas
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(&SubmitterConfig::default())
    }
}
