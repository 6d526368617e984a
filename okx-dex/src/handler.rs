//! Chain-family capability interface.
//!
//! Each [`ChainFamily`] has one [`ChainHandler`] implementation. The facade
//! resolves a chain index to its family once and then talks to the handler
//! only through this trait; callers never branch on the family themselves.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::chain::{ChainFamily, ChainIndex, ChainInfo};
use crate::error::DexError;
use crate::proto::{QuoteRequest, SwapRequest, SwapResult};
use crate::signer::SignerKey;

/// Parameters of a swap in raw units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    /// Chain to execute on.
    pub chain: ChainIndex,
    /// Input token address.
    pub from_token: String,
    /// Output token address.
    pub to_token: String,
    /// Input amount in raw units.
    pub amount: U256,
    /// Slippage tolerance as a fraction.
    pub slippage: Decimal,
    /// Wallet that signs and pays.
    pub wallet: String,
    /// Whether to wait for on-chain confirmation where it is optional.
    pub await_confirmation: bool,
}

impl SwapParams {
    /// Creates swap parameters that do not wait for optional confirmation.
    #[must_use]
    pub fn new(
        chain: ChainIndex,
        from_token: impl Into<String>,
        to_token: impl Into<String>,
        amount: U256,
        slippage: Decimal,
        wallet: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            from_token: from_token.into(),
            to_token: to_token.into(),
            amount,
            slippage,
            wallet: wallet.into(),
            await_confirmation: false,
        }
    }

    /// Waits for on-chain confirmation before returning.
    #[must_use]
    pub const fn with_confirmation(mut self) -> Self {
        self.await_confirmation = true;
        self
    }

    /// Builds the aggregator request for this swap.
    #[must_use]
    pub fn to_request(&self) -> SwapRequest {
        SwapRequest {
            quote: QuoteRequest::new(
                self.chain,
                self.from_token.clone(),
                self.to_token.clone(),
                self.amount,
            ),
            slippage: self.slippage,
            user_wallet_address: self.wallet.clone(),
        }
    }
}

/// Parameters of a standalone token approval in raw units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveParams {
    /// Chain to execute on.
    pub chain: ChainIndex,
    /// Token to approve.
    pub token: String,
    /// Allowance to grant in raw units.
    pub amount: U256,
    /// Owner of the tokens.
    pub wallet: String,
}

/// Executes aggregator payloads on one chain.
#[async_trait::async_trait]
pub trait ChainHandler: Send + Sync {
    /// The chain this handler executes on.
    fn chain(&self) -> &'static ChainInfo;

    /// The family of [`Self::chain`].
    fn family(&self) -> ChainFamily {
        self.chain().family
    }

    /// Executes a swap end to end.
    ///
    /// Returns only after the pipeline reached a terminal success; every
    /// failure after a transaction was sent carries its hash.
    async fn execute_swap(
        &self,
        params: &SwapParams,
        signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError>;

    /// Grants the aggregator an allowance and returns the transaction hash.
    async fn approve(
        &self,
        params: &ApproveParams,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError>;

    /// Reads a token's precision from the chain.
    async fn get_token_decimals(&self, token: &str) -> Result<u8, DexError>;

    /// Signs the swap payload and submits it through the aggregator's
    /// broadcast endpoint instead of an RPC node. Returns the order id.
    async fn broadcast_swap(
        &self,
        params: &SwapParams,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        let _ = (params, signer);
        Err(DexError::not_supported("broadcast_swap", self.chain().index))
    }
}

/// Handler for chains that are known but have no execution backend.
///
/// Every operation fails with [`DexError::NotSupported`].
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedHandler {
    chain: &'static ChainInfo,
}

impl UnimplementedHandler {
    /// Creates a handler for `chain`.
    #[must_use]
    pub const fn new(chain: &'static ChainInfo) -> Self {
        Self { chain }
    }
}

#[async_trait::async_trait]
impl ChainHandler for UnimplementedHandler {
    fn chain(&self) -> &'static ChainInfo {
        self.chain
    }

    async fn execute_swap(
        &self,
        _params: &SwapParams,
        _signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError> {
        Err(DexError::not_supported("execute_swap", self.chain.index))
    }

    async fn approve(
        &self,
        _params: &ApproveParams,
        _signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        Err(DexError::not_supported("approve", self.chain.index))
    }

    async fn get_token_decimals(&self, _token: &str) -> Result<u8, DexError> {
        Err(DexError::not_supported("get_token_decimals", self.chain.index))
    }
}
