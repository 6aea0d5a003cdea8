//! Wallet credential loaded once from the environment

use crate::config::WalletConfig;
use crate::error::{SubmitError, SubmitResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;

/// Private key and sender address. Absent variables become empty strings
/// and only fail when the credential is used.
#[derive(Clone)]
pub struct WalletCredential {
    private_key: String,
    address: String,
}

impl WalletCredential {
    pub fn new(private_key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            address: address.into(),
        }
    }

    /// Read the credential from the variables named in config
    pub fn from_env(config: &WalletConfig) -> Self {
        let private_key = std::env::var(&config.private_key_env).unwrap_or_default();
        let address = std::env::var(&config.address_env).unwrap_or_default();

        if private_key.is_empty() {
            tracing::warn!("{} is not set", config.private_key_env);
        }
        if address.is_empty() {
            tracing::warn!("{} is not set", config.address_env);
        }

        Self::new(private_key, address)
    }

    /// Sender address
    pub fn address(&self) -> SubmitResult<Address> {
        self.address
            .trim()
            .parse()
            .map_err(|e| SubmitError::Wallet(format!("Invalid wallet address: {}", e)))
    }

    /// Signer bound to a chain id
    pub fn signer(&self, chain_id: u64) -> SubmitResult<LocalWallet> {
        let key = self.private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        key.parse::<LocalWallet>()
            .map(|wallet| wallet.with_chain_id(chain_id))
            .map_err(|e| SubmitError::Wallet(format!("Invalid private key: {}", e)))
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredential")
            .field("private_key", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // Well-known development key (anvil/hardhat account 0)
    pub(crate) const DEV_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    pub(crate) const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_signer_matches_address() {
        let credential = WalletCredential::new(DEV_KEY, DEV_ADDRESS);
        let signer = credential.signer(8453).unwrap();
        assert_eq!(signer.address(), credential.address().unwrap());
        assert_eq!(signer.chain_id(), 8453);
    }

    #[test]
    fn test_empty_credential_fails_at_use() {
        let credential = WalletCredential::new("", "");
        assert_eq!(credential.signer(1).unwrap_err().kind(), ErrorKind::Submission);
        assert_eq!(credential.address().unwrap_err().kind(), ErrorKind::Submission);
    }

    #[test]
    fn test_debug_redacts_key() {
        let credential = WalletCredential::new(DEV_KEY, DEV_ADDRESS);
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("ac0974bec39a17e3"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_env_tolerates_missing_vars() {
        let config = WalletConfig {
            private_key_env: "DEPOSIT_TEST_UNSET_KEY".to_string(),
            address_env: "DEPOSIT_TEST_UNSET_ADDRESS".to_string(),
        };
        let credential = WalletCredential::from_env(&config);
        assert!(credential.signer(1).is_err());
    }
}
