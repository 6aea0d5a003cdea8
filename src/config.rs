//! Configuration management for the deposit submitter
//!
//! Loads configuration from an optional TOML file with environment variable
//! substitution. Every section has built-in defaults for the Base deposit
//! contract, so a missing file is not an error.

use crate::retry::{Backoff, RetryPolicy};

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_ENV: &str = "DEPOSIT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub submitter: SubmitterConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// Solidity signature of the zero-argument payable function
    pub deposit_function: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "Base".to_string(),
            rpc_url: "https://base.llamarpc.com".to_string(),
            chain_id: 8453,
            contract_address: "0xC5bf05cD32a14BFfb705Fb37a9d218895187376c".to_string(),
            deposit_function: "depositETH()".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn contract(&self) -> Result<Address> {
        self.contract_address
            .parse()
            .with_context(|| format!("Invalid contract address: {}", self.contract_address))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub private_key_env: String,
    pub address_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "PRIVATE_KEY".to_string(),
            address_env: "WALLET_ADDRESS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Deposit value in ETH, as a decimal string
    pub deposit_amount_eth: String,
    pub connect_attempts: u32,
    pub connect_retry_delay_secs: u64,
    /// 1 keeps the connect delay fixed, >1 grows it per attempt
    pub connect_backoff_factor: u32,
    pub connect_max_delay_secs: u64,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval_secs: u64,
    pub gas_limit_buffer_percent: u64,
    pub base_fee_multiplier_percent: u64,
    pub priority_fee_wei: u64,
    pub fallback_max_fee_wei: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            deposit_amount_eth: "0.00000000001".to_string(),
            connect_attempts: 3,
            connect_retry_delay_secs: 5,
            connect_backoff_factor: 1,
            connect_max_delay_secs: 60,
            receipt_poll_attempts: 30,
            receipt_poll_interval_secs: 1,
            gas_limit_buffer_percent: 5,
            base_fee_multiplier_percent: 110,
            // 0.005 gwei
            priority_fee_wei: 5_000_000,
            // 0.1 gwei
            fallback_max_fee_wei: 100_000_000,
        }
    }
}

impl SubmitterConfig {
    /// Deposit value in wei
    pub fn deposit_value(&self) -> Result<U256> {
        ethers::utils::parse_ether(self.deposit_amount_eth.trim())
            .with_context(|| format!("Invalid deposit amount: {}", self.deposit_amount_eth))
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        let delay = Duration::from_secs(self.connect_retry_delay_secs);
        let backoff = if self.connect_backoff_factor > 1 {
            Backoff::Exponential {
                initial: delay,
                factor: self.connect_backoff_factor,
                max: Duration::from_secs(self.connect_max_delay_secs),
            }
        } else {
            Backoff::Fixed(delay)
        };
        RetryPolicy::new(self.connect_attempts, backoff)
    }

    pub fn receipt_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.receipt_poll_attempts,
            Backoff::Fixed(Duration::from_secs(self.receipt_poll_interval_secs)),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 20,
            max_interval_secs: 90,
        }
    }
}

impl Settings {
    /// Load settings from `$DEPOSIT_CONFIG`, then `config/default.toml`,
    /// falling back to built-in defaults when neither exists
    pub fn load() -> Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(PathBuf::from(path)),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(PathBuf::from(DEFAULT_CONFIG_PATH))
            }
            Err(_) => {
                tracing::debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate settings from a specific file
    pub fn from_file(config_path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    fn parse(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            anyhow::bail!("Network {} has no RPC URL configured", self.network.name);
        }
        self.network.contract()?;
        self.submitter.deposit_value()?;

        if self.submitter.connect_attempts == 0 || self.submitter.receipt_poll_attempts == 0 {
            anyhow::bail!("Attempt counts must be at least 1");
        }
        if self.run.min_interval_secs > self.run.max_interval_secs {
            anyhow::bail!(
                "min_interval_secs ({}) exceeds max_interval_secs ({})",
                self.run.min_interval_secs,
                self.run.max_interval_secs
            );
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder regex");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
