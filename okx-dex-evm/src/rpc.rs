//! Chain access for the EVM pipeline.
//!
//! [`EvmRpc`] lists exactly the node reads and writes the pipeline performs.
//! [`AlloyRpc`] implements it over any `alloy` [`Provider`].

use alloy_network::{Ethereum, EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use std::sync::Arc;
use url::Url;

use crate::contract::IERC20;

/// Errors returned by [`EvmRpc`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum EvmRpcError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Contract call error.
    #[error(transparent)]
    Contract(#[from] alloy_contract::Error),
    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

/// An EIP-1559 transaction before signing.
///
/// Optional fields are filled by the pipeline only when absent; values set
/// by the caller are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    /// Sender.
    pub from: Option<Address>,
    /// Recipient contract.
    pub to: Address,
    /// Native value.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Sender nonce.
    pub nonce: Option<u64>,
    /// Gas limit.
    pub gas_limit: Option<u64>,
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 tip.
    pub max_priority_fee_per_gas: Option<u128>,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

impl TransactionDraft {
    /// Creates a zero-value draft calling `to` with `data`.
    #[must_use]
    pub fn new(chain_id: u64, to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to,
            value: U256::ZERO,
            data,
            nonce: None,
            gas_limit: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            chain_id,
        }
    }

    /// Sets the sender.
    #[must_use]
    pub const fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the native value.
    #[must_use]
    pub const fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Converts the draft into an `alloy` request.
    #[must_use]
    pub fn to_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.data.clone())
            .with_chain_id(self.chain_id);
        if let Some(from) = self.from {
            request.set_from(from);
        }
        if let Some(nonce) = self.nonce {
            request.set_nonce(nonce);
        }
        if let Some(gas_limit) = self.gas_limit {
            request.set_gas_limit(gas_limit);
        }
        if let Some(max_fee) = self.max_fee_per_gas {
            request.set_max_fee_per_gas(max_fee);
        }
        if let Some(priority) = self.max_priority_fee_per_gas {
            request.set_max_priority_fee_per_gas(priority);
        }
        request
    }
}

/// Node operations used by the EVM pipeline.
pub trait EvmRpc: Send + Sync {
    /// Current transaction count of `address`.
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, EvmRpcError>> + Send;

    /// Base fee of the latest block; zero on chains without one.
    fn base_fee(&self) -> impl Future<Output = Result<u128, EvmRpcError>> + Send;

    /// Current priority fee suggestion.
    fn max_priority_fee(&self) -> impl Future<Output = Result<u128, EvmRpcError>> + Send;

    /// Gas estimate for `draft` against the latest state.
    fn estimate_gas(
        &self,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<u64, EvmRpcError>> + Send;

    /// Read-only execution of `draft`.
    fn call(
        &self,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<Bytes, EvmRpcError>> + Send;

    /// ERC-20 allowance granted by `owner` to `spender`.
    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, EvmRpcError>> + Send;

    /// ERC-20 precision.
    fn decimals(&self, token: Address) -> impl Future<Output = Result<u8, EvmRpcError>> + Send;

    /// Signs a fully filled draft and submits it.
    fn send_signed(
        &self,
        draft: &TransactionDraft,
        signer: &PrivateKeySigner,
    ) -> impl Future<Output = Result<TxHash, EvmRpcError>> + Send;

    /// Receipt status of `hash`: `None` while pending.
    fn receipt_status(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<bool>, EvmRpcError>> + Send;
}

impl<T: EvmRpc> EvmRpc for Arc<T> {
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, EvmRpcError>> + Send {
        (**self).transaction_count(address)
    }

    fn base_fee(&self) -> impl Future<Output = Result<u128, EvmRpcError>> + Send {
        (**self).base_fee()
    }

    fn max_priority_fee(&self) -> impl Future<Output = Result<u128, EvmRpcError>> + Send {
        (**self).max_priority_fee()
    }

    fn estimate_gas(
        &self,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<u64, EvmRpcError>> + Send {
        (**self).estimate_gas(draft)
    }

    fn call(
        &self,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<Bytes, EvmRpcError>> + Send {
        (**self).call(draft)
    }

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, EvmRpcError>> + Send {
        (**self).allowance(token, owner, spender)
    }

    fn decimals(&self, token: Address) -> impl Future<Output = Result<u8, EvmRpcError>> + Send {
        (**self).decimals(token)
    }

    fn send_signed(
        &self,
        draft: &TransactionDraft,
        signer: &PrivateKeySigner,
    ) -> impl Future<Output = Result<TxHash, EvmRpcError>> + Send {
        (**self).send_signed(draft, signer)
    }

    fn receipt_status(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<bool>, EvmRpcError>> + Send {
        (**self).receipt_status(hash)
    }
}

/// [`EvmRpc`] over an `alloy` provider.
#[derive(Debug, Clone)]
pub struct AlloyRpc<P> {
    provider: P,
}

impl<P> AlloyRpc<P> {
    /// Wraps a provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the wrapped provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl AlloyRpc<DynProvider> {
    /// Connects to an HTTP JSON-RPC endpoint.
    #[must_use]
    pub fn connect_http(url: Url) -> Self {
        #[cfg(feature = "telemetry")]
        tracing::info!(rpc_url = %url, "Using HTTP transport");
        Self::new(ProviderBuilder::new().connect_http(url).erased())
    }
}

impl<P> EvmRpc for AlloyRpc<P>
where
    P: Provider + Send + Sync,
{
    async fn transaction_count(&self, address: Address) -> Result<u64, EvmRpcError> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    async fn base_fee(&self) -> Result<u128, EvmRpcError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| EvmRpcError::Custom("latest block not found".into()))?;
        Ok(block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .unwrap_or_default())
    }

    async fn max_priority_fee(&self) -> Result<u128, EvmRpcError> {
        Ok(self.provider.get_max_priority_fee_per_gas().await?)
    }

    async fn estimate_gas(&self, draft: &TransactionDraft) -> Result<u64, EvmRpcError> {
        Ok(self.provider.estimate_gas(draft.to_request()).await?)
    }

    async fn call(&self, draft: &TransactionDraft) -> Result<Bytes, EvmRpcError> {
        Ok(self.provider.call(draft.to_request()).await?)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, EvmRpcError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.allowance(owner, spender).call().await?)
    }

    async fn decimals(&self, token: Address) -> Result<u8, EvmRpcError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.decimals().call().await?)
    }

    async fn send_signed(
        &self,
        draft: &TransactionDraft,
        signer: &PrivateKeySigner,
    ) -> Result<TxHash, EvmRpcError> {
        let wallet = EthereumWallet::from(signer.clone());
        let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(
            draft.to_request(),
            &wallet,
        )
        .await
        .map_err(|e| EvmRpcError::Custom(e.to_string()))?;
        let pending = self.provider.send_tx_envelope(envelope).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, hash: TxHash) -> Result<Option<bool>, EvmRpcError> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| r.status()))
    }
}
