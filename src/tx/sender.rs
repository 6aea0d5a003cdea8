//! Deposit submitter: one payable call per invocation, confirmed by receipt
//! polling

use super::gas::{FeeQuote, FeeSource, GasEstimator};
use super::{Deposit, TxOutcome, TxStatus};
use crate::chain::ChainClient;
use crate::config::{NetworkConfig, Settings};
use crate::error::{SubmitError, SubmitResult};
use crate::retry::RetryPolicy;
use crate::wallet::WalletCredential;

use async_trait::async_trait;
use ethers::signers::Signer;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, H256, U256};
use ethers::utils::format_ether;
use tracing::{debug, error, info, warn};

/// Submits the configured deposit call and waits for its receipt
pub struct DepositSubmitter<C> {
    /// Node access
    client: C,
    network: NetworkConfig,
    contract: Address,
    /// Selector of the zero-argument deposit function
    calldata: Bytes,
    /// Value sent with every deposit, in wei
    value: U256,
    wallet: WalletCredential,
    gas_estimator: GasEstimator,
    connect_policy: RetryPolicy,
    receipt_policy: RetryPolicy,
}

impl<C: ChainClient> DepositSubmitter<C> {
    pub fn new(client: C, settings: &Settings, wallet: WalletCredential) -> SubmitResult<Self> {
        let contract = settings
            .network
            .contract()
            .map_err(|e| SubmitError::Config(format!("{:#}", e)))?;
        let value = settings
            .submitter
            .deposit_value()
            .map_err(|e| SubmitError::Config(format!("{:#}", e)))?;
        let calldata = Bytes::from(ethers::utils::id(&settings.network.deposit_function).to_vec());

        info!(
            "Deposit submitter for {} (chain {}) targeting {:?}",
            settings.network.name, settings.network.chain_id, contract
        );

        Ok(Self {
            client,
            network: settings.network.clone(),
            contract,
            calldata,
            value,
            wallet,
            gas_estimator: GasEstimator::new(&settings.submitter),
            connect_policy: settings.submitter.connect_policy(),
            receipt_policy: settings.submitter.receipt_policy(),
        })
    }

    /// Check the endpoint is reachable, retrying per the connect policy
    pub async fn connect(&self) -> SubmitResult<u64> {
        let operation = format!("Connection to {}", self.network.name);
        let result = self
            .connect_policy
            .run(&operation, |_| self.client.block_number())
            .await;

        match result {
            Ok(block) => {
                debug!("Connected to {} at block {}", self.network.name, block);
                Ok(block)
            }
            Err(SubmitError::Connection { message, .. }) => Err(SubmitError::Connection {
                network: self.network.name.clone(),
                attempts: self.connect_policy.max_attempts(),
                message,
            }),
            Err(e) => Err(e),
        }
    }

    /// Node gas estimate for the deposit call plus the safety margin
    pub async fn estimate_gas(&self, from: Address) -> SubmitResult<U256> {
        let request = self.base_request(from);
        let estimate = self
            .client
            .estimate_gas(&TypedTransaction::Eip1559(request))
            .await?;
        let gas_limit = self.gas_estimator.gas_limit(estimate);
        debug!("Gas estimate {} -> limit {}", estimate, gas_limit);
        Ok(gas_limit)
    }

    pub async fn estimate_fee(&self) -> FeeQuote {
        self.gas_estimator.quote(&self.client).await
    }

    /// Fail unless the balance covers value plus worst-case gas. Returns the
    /// total cost in wei.
    pub async fn check_affordability(
        &self,
        from: Address,
        gas_limit: U256,
        fee: &FeeQuote,
    ) -> SubmitResult<U256> {
        let gas_cost = GasEstimator::calculate_cost(gas_limit, fee);
        info!("Estimated gas cost: {} ETH", format_ether(gas_cost));

        let balance = self.client.balance(from).await?;
        let total_cost = self.value + gas_cost;

        if balance < total_cost {
            return Err(SubmitError::InsufficientFunds {
                have: format_ether(balance),
                need: format_ether(total_cost),
            });
        }

        Ok(total_cost)
    }

    /// Fully populated deposit transaction
    pub fn build_transaction(
        &self,
        from: Address,
        nonce: U256,
        gas_limit: U256,
        fee: &FeeQuote,
    ) -> TypedTransaction {
        let request = self
            .base_request(from)
            .nonce(nonce)
            .gas(gas_limit)
            .max_fee_per_gas(fee.max_fee_per_gas)
            .max_priority_fee_per_gas(fee.max_priority_fee_per_gas);
        TypedTransaction::Eip1559(request)
    }

    /// Sign locally and broadcast
    pub async fn sign_and_send(&self, tx: &TypedTransaction) -> SubmitResult<H256> {
        let signer = self.wallet.signer(self.network.chain_id)?;
        let signature = signer
            .sign_transaction(tx)
            .await
            .map_err(|e| SubmitError::Submission(format!("Failed to sign transaction: {}", e)))?;

        let raw = tx.rlp_signed(&signature);
        let tx_hash = self.client.send_raw_transaction(raw).await?;
        info!("Transaction sent: {:?}", tx_hash);
        Ok(tx_hash)
    }

    /// Poll for the receipt until found or the receipt policy runs out
    pub async fn confirm(&self, tx_hash: H256) -> SubmitResult<TxStatus> {
        let receipt = self
            .receipt_policy
            .poll(|_| self.client.transaction_receipt(tx_hash))
            .await;

        match receipt {
            Some(receipt) => Ok(TxStatus::from_receipt(&receipt)),
            None => Err(SubmitError::ConfirmationTimeout {
                tx_hash: format!("{:?}", tx_hash),
                attempts: self.receipt_policy.max_attempts(),
            }),
        }
    }

    fn base_request(&self, from: Address) -> Eip1559TransactionRequest {
        Eip1559TransactionRequest::new()
            .from(from)
            .to(self.contract)
            .value(self.value)
            .data(self.calldata.clone())
            .chain_id(self.network.chain_id)
    }

    async fn send_deposit(&self) -> SubmitResult<TxOutcome> {
        self.connect().await?;

        let from = self.wallet.address()?;
        let gas_limit = self.estimate_gas(from).await?;
        let fee = self.estimate_fee().await;
        if fee.source == FeeSource::Fallback {
            warn!("Using fallback fees: {:?}", fee);
        }
        self.check_affordability(from, gas_limit, &fee).await?;

        let nonce = self.client.transaction_count(from).await?;
        let tx = self.build_transaction(from, nonce, gas_limit, &fee);
        let hash = self.sign_and_send(&tx).await?;

        let status = match self.confirm(hash).await {
            Ok(status) => status,
            Err(e) if e.after_submission() => {
                warn!("{}", e);
                TxStatus::Pending
            }
            Err(e) => return Err(e),
        };

        Ok(TxOutcome { hash, status })
    }
}

#[async_trait]
impl<C: ChainClient> Deposit for DepositSubmitter<C> {
    async fn submit(&self) -> SubmitResult<TxOutcome> {
        let result = self.send_deposit().await;
        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::error::ErrorKind;
    use crate::wallet::tests::{DEV_ADDRESS, DEV_KEY};

    use ethers::types::{TransactionReceipt, U64};
    use std::time::Duration;
    use tokio::time::Instant;

    const BASE_FEE: u64 = 1_000_000_000;
    const GAS_ESTIMATE: u64 = 100_000;
    const DEPOSIT_WEI: u64 = 10_000_000;

    fn reference_total() -> U256 {
        U256::from(DEPOSIT_WEI) + U256::from(105_000u64) * U256::from(1_105_000_000u64)
    }

    fn tx_hash() -> H256 {
        H256::repeat_byte(0xab)
    }

    fn submitter(client: MockChainClient) -> DepositSubmitter<MockChainClient> {
        submitter_with_wallet(client, WalletCredential::new(DEV_KEY, DEV_ADDRESS))
    }

    fn submitter_with_wallet(
        client: MockChainClient,
        wallet: WalletCredential,
    ) -> DepositSubmitter<MockChainClient> {
        DepositSubmitter::new(client, &Settings::default(), wallet).unwrap()
    }

    /// Expectations for a healthy node up to the affordability check
    fn reachable_node(balance: U256) -> MockChainClient {
        let mut client = MockChainClient::new();
        client.expect_block_number().returning(|| Ok(42));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(GAS_ESTIMATE)));
        client
            .expect_latest_base_fee()
            .returning(|| Ok(U256::from(BASE_FEE)));
        client.expect_balance().returning(move |_| Ok(balance));
        client
    }

    fn receipt(status: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash(),
            status: Some(U64::from(status)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insufficient_balance_sends_nothing() {
        let mut client = reachable_node(reference_total() - 1);
        client.expect_transaction_count().times(0);
        client.expect_send_raw_transaction().times(0);

        let err = submitter(client).submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Affordability);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_balance_is_enough() {
        let mut client = reachable_node(reference_total());
        client
            .expect_transaction_count()
            .returning(|_| Ok(U256::from(3u64)));
        client
            .expect_send_raw_transaction()
            .times(1)
            .returning(|_| Ok(tx_hash()));
        client
            .expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(1))));

        let outcome = submitter(client).submit().await.unwrap();
        assert_eq!(outcome.status, TxStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_deposit_reports_receipt_status() {
        let mut client = reachable_node(U256::exp10(18));
        let expected_from: Address = DEV_ADDRESS.parse().unwrap();
        client
            .expect_transaction_count()
            .withf(move |address| *address == expected_from)
            .times(1)
            .returning(|_| Ok(U256::from(7u64)));
        client
            .expect_send_raw_transaction()
            .withf(|raw| raw.first() == Some(&0x02))
            .times(1)
            .returning(|_| Ok(tx_hash()));

        let mut polls = 0;
        client.expect_transaction_receipt().returning(move |_| {
            polls += 1;
            if polls < 3 {
                Ok(None)
            } else {
                Ok(Some(receipt(1)))
            }
        });

        let start = Instant::now();
        let outcome = submitter(client).submit().await.unwrap();
        assert_eq!(
            outcome,
            TxOutcome {
                hash: tx_hash(),
                status: TxStatus::Success
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_deposit_reports_failed() {
        let mut client = reachable_node(U256::exp10(18));
        client
            .expect_transaction_count()
            .returning(|_| Ok(U256::zero()));
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(tx_hash()));
        client
            .expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(0))));

        let outcome = submitter(client).submit().await.unwrap();
        assert_eq!(outcome.status, TxStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_receipt_reports_pending_after_thirty_polls() {
        let mut client = reachable_node(U256::exp10(18));
        client
            .expect_transaction_count()
            .returning(|_| Ok(U256::zero()));
        client
            .expect_send_raw_transaction()
            .returning(|_| Ok(tx_hash()));
        client
            .expect_transaction_receipt()
            .times(30)
            .returning(|_| Ok(None));

        let start = Instant::now();
        let outcome = submitter(client).submit().await.unwrap();
        assert_eq!(outcome.status, TxStatus::Pending);
        assert_eq!(outcome.hash, tx_hash());
        assert_eq!(start.elapsed(), Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_node_gives_up_after_three_attempts() {
        let mut client = MockChainClient::new();
        client.expect_block_number().times(3).returning(|| {
            Err(SubmitError::Connection {
                network: "Base".into(),
                attempts: 1,
                message: "connection refused".into(),
            })
        });
        client.expect_estimate_gas().times(0);
        client.expect_send_raw_transaction().times(0);

        let start = Instant::now();
        let err = submitter(client).submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(matches!(err, SubmitError::Connection { attempts: 3, .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_gas_estimation_failure_aborts_without_retry() {
        let mut client = MockChainClient::new();
        client.expect_block_number().returning(|| Ok(1));
        client
            .expect_estimate_gas()
            .times(1)
            .returning(|_| Err(SubmitError::GasEstimation("execution reverted".into())));
        client.expect_balance().times(0);
        client.expect_send_raw_transaction().times(0);

        let err = submitter(client).submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Estimation);
    }

    #[tokio::test]
    async fn test_fee_read_failure_uses_fallback() {
        let mut client = MockChainClient::new();
        client.expect_block_number().returning(|| Ok(1));
        client
            .expect_estimate_gas()
            .returning(|_| Ok(U256::from(GAS_ESTIMATE)));
        client
            .expect_latest_base_fee()
            .returning(|| Err(SubmitError::FeeEstimation("No latest block".into())));
        // 105_000 * 0.1 gwei + deposit, one wei short
        let fallback_total =
            U256::from(DEPOSIT_WEI) + U256::from(105_000u64) * U256::from(100_000_000u64);
        client
            .expect_balance()
            .returning(move |_| Ok(fallback_total - 1));

        let err = submitter(client).submit().await.unwrap_err();
        match err {
            SubmitError::InsufficientFunds { need, .. } => {
                assert_eq!(need, format_ether(fallback_total));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_key_is_a_submission_error() {
        let mut client = reachable_node(U256::exp10(18));
        client
            .expect_transaction_count()
            .returning(|_| Ok(U256::zero()));
        client.expect_send_raw_transaction().times(0);

        let wallet = WalletCredential::new("", DEV_ADDRESS);
        let err = submitter_with_wallet(client, wallet).submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Submission);
    }

    #[tokio::test]
    async fn test_node_rejection_is_a_submission_error() {
        let mut client = reachable_node(U256::exp10(18));
        client
            .expect_transaction_count()
            .returning(|_| Ok(U256::zero()));
        client
            .expect_send_raw_transaction()
            .returning(|_| Err(SubmitError::Submission("nonce too low".into())));
        client.expect_transaction_receipt().times(0);

        let err = submitter(client).submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Submission);
    }

    #[test]
    fn test_build_transaction_fields() {
        let submitter = submitter(MockChainClient::new());
        let from: Address = DEV_ADDRESS.parse().unwrap();
        let estimator = GasEstimator::default();
        let fee = estimator.fee_from_base(U256::from(BASE_FEE));

        let tx = submitter.build_transaction(from, U256::from(9u64), U256::from(105_000u64), &fee);
        let TypedTransaction::Eip1559(request) = tx else {
            panic!("expected an EIP-1559 transaction");
        };

        assert_eq!(request.from, Some(from));
        assert_eq!(request.nonce, Some(U256::from(9u64)));
        assert_eq!(request.gas, Some(U256::from(105_000u64)));
        assert_eq!(request.value, Some(U256::from(DEPOSIT_WEI)));
        assert_eq!(request.max_fee_per_gas, Some(U256::from(1_105_000_000u64)));
        assert_eq!(request.max_priority_fee_per_gas, Some(U256::from(5_000_000u64)));
        assert_eq!(request.chain_id, Some(U64::from(8453)));
        assert_eq!(
            request.data.as_ref().map(|d| d.to_vec()),
            Some(ethers::utils::id("depositETH()").to_vec())
        );
    }
}
