//! The fill, simulate, sign, broadcast and confirm pipeline.
//!
//! Approval and swap transactions go through the same
//! [`TransactionPipeline::send`]; they differ only in the
//! [`FeeMultiplier`] applied to the base fee.
//!
//! # Nonce sequencing
//!
//! The nonce is read from the node at call time without coordination.
//! Two overlapping sends from the same sender can read the same nonce and
//! one of them will be rejected or replaced. Callers must serialize sends
//! per signer.

use alloy_primitives::TxHash;
use alloy_signer_local::PrivateKeySigner;
use okx_dex::DexError;
use std::time::Duration;

use crate::rpc::{EvmRpc, TransactionDraft};

/// Base-fee multiplier used to cap `maxFeePerGas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMultiplier {
    /// 1.2x, for approvals.
    Approval,
    /// 5x, for swaps, which must survive base-fee spikes while pending.
    Swap,
}

impl FeeMultiplier {
    /// Applies the multiplier to `base_fee` with integer arithmetic.
    #[must_use]
    pub const fn apply(self, base_fee: u128) -> u128 {
        match self {
            Self::Approval => base_fee.saturating_mul(12) / 10,
            Self::Swap => base_fee.saturating_mul(5),
        }
    }

    /// `maxFeePerGas = multiplier(base_fee) + priority_fee`.
    #[must_use]
    pub const fn max_fee(self, base_fee: u128, priority_fee: u128) -> u128 {
        self.apply(base_fee).saturating_add(priority_fee)
    }
}

/// Confirmation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Upper bound on the wait for a receipt.
    pub receipt_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl PipelineConfig {
    /// Default receipt timeout (120 seconds).
    pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
    /// Default poll interval (1 second).
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receipt_timeout: Self::DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Sends transactions through simulation, filling, signing and confirmation.
#[derive(Debug, Clone)]
pub struct TransactionPipeline<R> {
    rpc: R,
    config: PipelineConfig,
}

impl<R: EvmRpc> TransactionPipeline<R> {
    /// Creates a pipeline with the default confirmation settings.
    pub fn new(rpc: R) -> Self {
        Self::with_config(rpc, PipelineConfig::default())
    }

    /// Creates a pipeline with custom confirmation settings.
    pub const fn with_config(rpc: R, config: PipelineConfig) -> Self {
        Self { rpc, config }
    }

    /// Returns the underlying RPC.
    pub const fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Returns the confirmation settings.
    pub const fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Sends `draft` and waits for a successful receipt.
    ///
    /// # Errors
    ///
    /// - [`DexError::Configuration`] if `from` is missing or is not the signer
    /// - [`DexError::SimulationFailure`] if estimation or the dry-run call fails;
    ///   nothing is sent in that case
    /// - [`DexError::Rpc`] if a nonce or fee read fails
    /// - [`DexError::BroadcastFailure`] if the node rejects the transaction
    /// - [`DexError::TransactionFailed`] if the receipt reports failure
    /// - [`DexError::ConfirmationTimeout`] if no receipt arrives in time
    pub async fn send(
        &self,
        mut draft: TransactionDraft,
        multiplier: FeeMultiplier,
        signer: &PrivateKeySigner,
    ) -> Result<TxHash, DexError> {
        let from = draft
            .from
            .ok_or_else(|| DexError::Configuration("transaction has no sender".into()))?;
        if from != signer.address() {
            return Err(DexError::Configuration(format!(
                "signer {} does not match sender {from}",
                signer.address()
            )));
        }

        let estimate = self.simulate(&draft).await?;

        if draft.nonce.is_none() {
            draft.nonce = Some(self.rpc.transaction_count(from).await.map_err(rpc_error)?);
        }
        if draft.max_fee_per_gas.is_none() || draft.max_priority_fee_per_gas.is_none() {
            let priority = match draft.max_priority_fee_per_gas {
                Some(priority) => priority,
                None => self.rpc.max_priority_fee().await.map_err(rpc_error)?,
            };
            let base_fee = self.rpc.base_fee().await.map_err(rpc_error)?;
            draft.max_priority_fee_per_gas = Some(priority);
            draft
                .max_fee_per_gas
                .get_or_insert(multiplier.max_fee(base_fee, priority));
        }
        draft.gas_limit.get_or_insert(estimate);

        let hash = self
            .rpc
            .send_signed(&draft, signer)
            .await
            .map_err(|e| DexError::BroadcastFailure(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            tx = %hash,
            chain_id = draft.chain_id,
            nonce = ?draft.nonce,
            max_fee_per_gas = ?draft.max_fee_per_gas,
            ?multiplier,
            "Transaction sent"
        );

        self.await_receipt(hash).await?;
        Ok(hash)
    }

    /// Estimates gas and, for calls carrying data, dry-runs the call.
    async fn simulate(&self, draft: &TransactionDraft) -> Result<u64, DexError> {
        let estimate = self
            .rpc
            .estimate_gas(draft)
            .await
            .map_err(|e| DexError::SimulationFailure(e.to_string()))?;
        if !draft.data.is_empty() {
            self.rpc
                .call(draft)
                .await
                .map_err(|e| DexError::SimulationFailure(e.to_string()))?;
        }
        Ok(estimate)
    }

    /// Polls for the receipt until it arrives or the timeout elapses.
    #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
    async fn await_receipt(&self, hash: TxHash) -> Result<(), DexError> {
        let poll = async {
            loop {
                match self.rpc.receipt_status(hash).await {
                    Ok(Some(true)) => return Ok(()),
                    Ok(Some(false)) => {
                        return Err(DexError::TransactionFailed {
                            tx_hash: hash.to_string(),
                            reason: Some("receipt status is failure".into()),
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        #[cfg(feature = "telemetry")]
                        tracing::warn!(tx = %hash, error = %err, "Receipt poll failed");
                    }
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        tokio::time::timeout(self.config.receipt_timeout, poll)
            .await
            .unwrap_or_else(|_| {
                Err(DexError::ConfirmationTimeout {
                    tx_hash: Some(hash.to_string()),
                })
            })
    }
}

fn rpc_error(err: impl std::fmt::Display) -> DexError {
    DexError::Rpc(err.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rpc::EvmRpcError;
    use alloy_primitives::{Address, Bytes, U256, address};
    use std::sync::Mutex;

    /// Test key; never holds funds.
    pub(crate) const TEST_KEY: &str =
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    pub(crate) fn test_signer() -> PrivateKeySigner {
        TEST_KEY.parse().unwrap()
    }

    #[derive(Debug)]
    pub(crate) struct FakeState {
        pub nonce: u64,
        pub base_fee: u128,
        pub priority_fee: u128,
        pub estimate: Result<u64, String>,
        pub call_revert: Option<String>,
        pub allowance: U256,
        pub decimals: u8,
        pub send_error: Option<String>,
        pub receipt: Option<bool>,
        pub receipt_errors: usize,
        pub sent: Vec<TransactionDraft>,
        pub allowance_queries: usize,
    }

    impl Default for FakeState {
        fn default() -> Self {
            Self {
                nonce: 7,
                base_fee: 10_000_000_000,
                priority_fee: 1_000_000_000,
                estimate: Ok(50_000),
                call_revert: None,
                allowance: U256::ZERO,
                decimals: 6,
                send_error: None,
                receipt: Some(true),
                receipt_errors: 0,
                sent: Vec::new(),
                allowance_queries: 0,
            }
        }
    }

    /// In-memory node. An approval that confirms raises the allowance.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRpc {
        pub state: Mutex<FakeState>,
    }

    impl FakeRpc {
        pub(crate) fn with(state: FakeState) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }

        pub(crate) fn sent(&self) -> Vec<TransactionDraft> {
            self.state.lock().unwrap().sent.clone()
        }
    }

    impl EvmRpc for FakeRpc {
        async fn transaction_count(&self, _address: Address) -> Result<u64, EvmRpcError> {
            Ok(self.state.lock().unwrap().nonce)
        }

        async fn base_fee(&self) -> Result<u128, EvmRpcError> {
            Ok(self.state.lock().unwrap().base_fee)
        }

        async fn max_priority_fee(&self) -> Result<u128, EvmRpcError> {
            Ok(self.state.lock().unwrap().priority_fee)
        }

        async fn estimate_gas(&self, _draft: &TransactionDraft) -> Result<u64, EvmRpcError> {
            self.state
                .lock()
                .unwrap()
                .estimate
                .clone()
                .map_err(EvmRpcError::Custom)
        }

        async fn call(&self, _draft: &TransactionDraft) -> Result<Bytes, EvmRpcError> {
            match &self.state.lock().unwrap().call_revert {
                Some(reason) => Err(EvmRpcError::Custom(reason.clone())),
                None => Ok(Bytes::new()),
            }
        }

        async fn allowance(
            &self,
            _token: Address,
            _owner: Address,
            _spender: Address,
        ) -> Result<U256, EvmRpcError> {
            let mut state = self.state.lock().unwrap();
            state.allowance_queries += 1;
            Ok(state.allowance)
        }

        async fn decimals(&self, _token: Address) -> Result<u8, EvmRpcError> {
            Ok(self.state.lock().unwrap().decimals)
        }

        async fn send_signed(
            &self,
            draft: &TransactionDraft,
            _signer: &PrivateKeySigner,
        ) -> Result<TxHash, EvmRpcError> {
            let mut state = self.state.lock().unwrap();
            if let Some(err) = &state.send_error {
                return Err(EvmRpcError::Custom(err.clone()));
            }
            state.sent.push(draft.clone());
            // approve(address,uint256) selector
            if draft.data.starts_with(&[0x09, 0x5e, 0xa7, 0xb3]) && state.receipt == Some(true) {
                state.allowance = U256::from_be_slice(&draft.data[36..68]);
            }
            Ok(TxHash::with_last_byte(u8::try_from(state.sent.len()).unwrap()))
        }

        async fn receipt_status(&self, _hash: TxHash) -> Result<Option<bool>, EvmRpcError> {
            let mut state = self.state.lock().unwrap();
            if state.receipt_errors > 0 {
                state.receipt_errors -= 1;
                return Err(EvmRpcError::Custom("connection reset".into()));
            }
            Ok(state.receipt)
        }
    }

    pub(crate) fn fast_config() -> PipelineConfig {
        PipelineConfig {
            receipt_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn draft(signer: &PrivateKeySigner) -> TransactionDraft {
        TransactionDraft::new(
            1,
            address!("0x1111111254eeb25477b68fb85ed929f73a960582"),
            Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        )
        .with_from(signer.address())
    }

    #[test]
    fn test_fee_multipliers() {
        assert_eq!(FeeMultiplier::Approval.apply(100), 120);
        assert_eq!(FeeMultiplier::Swap.apply(100), 500);
        assert_eq!(FeeMultiplier::Approval.max_fee(100, 7), 127);
        assert_eq!(FeeMultiplier::Swap.max_fee(100, 7), 507);
        assert_eq!(FeeMultiplier::Swap.max_fee(u128::MAX, 1), u128::MAX);
    }

    #[tokio::test]
    async fn test_fills_absent_fields_with_capped_fees() {
        let signer = test_signer();
        let pipeline = TransactionPipeline::with_config(FakeRpc::default(), fast_config());
        pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap();

        let sent = pipeline.rpc().sent();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(tx.nonce, Some(7));
        assert_eq!(tx.gas_limit, Some(50_000));
        assert_eq!(tx.max_priority_fee_per_gas, Some(1_000_000_000));
        assert_eq!(tx.max_fee_per_gas, Some(10_000_000_000 * 5 + 1_000_000_000));
    }

    #[tokio::test]
    async fn test_caller_values_are_never_overwritten() {
        let signer = test_signer();
        let pipeline = TransactionPipeline::with_config(FakeRpc::default(), fast_config());
        let mut tx = draft(&signer).with_gas_limit(90_000);
        tx.nonce = Some(42);
        tx.max_fee_per_gas = Some(3);
        pipeline
            .send(tx, FeeMultiplier::Approval, &signer)
            .await
            .unwrap();

        let sent = &pipeline.rpc().sent()[0];
        assert_eq!(sent.nonce, Some(42));
        assert_eq!(sent.gas_limit, Some(90_000));
        assert_eq!(sent.max_fee_per_gas, Some(3));
        assert_eq!(sent.max_priority_fee_per_gas, Some(1_000_000_000));
    }

    #[tokio::test]
    async fn test_revert_aborts_before_send() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            call_revert: Some("execution reverted: Min return not reached".into()),
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        let err = pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap_err();
        assert!(
            matches!(err, DexError::SimulationFailure(ref reason) if reason.contains("Min return"))
        );
        assert!(pipeline.rpc().sent().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_failure_aborts_before_send() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            estimate: Err("insufficient funds for gas".into()),
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        let err = pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::SimulationFailure(_)));
        assert!(pipeline.rpc().sent().is_empty());
    }

    #[tokio::test]
    async fn test_sender_must_match_signer() {
        let signer = test_signer();
        let pipeline = TransactionPipeline::with_config(FakeRpc::default(), fast_config());

        let mut missing = draft(&signer);
        missing.from = None;
        assert!(matches!(
            pipeline.send(missing, FeeMultiplier::Swap, &signer).await,
            Err(DexError::Configuration(_))
        ));

        let other = draft(&signer).with_from(Address::ZERO);
        assert!(matches!(
            pipeline.send(other, FeeMultiplier::Swap, &signer).await,
            Err(DexError::Configuration(_))
        ));
        assert!(pipeline.rpc().sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_receipt_carries_hash() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            receipt: Some(false),
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        let err = pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::TransactionFailed { .. }));
        assert_eq!(err.tx_hash(), Some(TxHash::with_last_byte(1).to_string().as_str()));
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out_with_hash() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            receipt: None,
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        let err = pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::ConfirmationTimeout { tx_hash: Some(_) }));
        assert_eq!(pipeline.rpc().sent().len(), 1, "no resubmission");
    }

    #[tokio::test]
    async fn test_transient_receipt_errors_are_retried() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            receipt_errors: 2,
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        assert!(
            pipeline
                .send(draft(&signer), FeeMultiplier::Swap, &signer)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_rejected_send_is_broadcast_failure() {
        let signer = test_signer();
        let rpc = FakeRpc::with(FakeState {
            send_error: Some("nonce too low".into()),
            ..FakeState::default()
        });
        let pipeline = TransactionPipeline::with_config(rpc, fast_config());
        let err = pipeline
            .send(draft(&signer), FeeMultiplier::Swap, &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::BroadcastFailure(ref m) if m == "nonce too low"));
    }
}
