//! The aggregator client interface.
//!
//! [`DexApi`] is the seam between execution pipelines and the aggregator's
//! REST API. `okx-dex-http` provides the production implementation; tests
//! substitute in-memory fakes.

use alloy_primitives::U256;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::chain::ChainIndex;
use crate::error::DexError;
use crate::proto::{
    ApproveTransaction, BroadcastRequest, Chain, LiquiditySource, OrdersQuery, QuoteRequest,
    RouterResult, SwapInfo, SwapRequest, Token, TokenAsset, TokenBalanceRequestItem, TokenPrice,
    TransactionOrder,
};

/// Read and routing operations offered by the aggregator.
///
/// Every call is a single signed HTTP request; implementations do not retry.
#[async_trait::async_trait]
pub trait DexApi: Send + Sync {
    /// Lists the chains the aggregator routes on.
    async fn supported_chains(&self) -> Result<Vec<Chain>, DexError>;

    /// Lists the tokens tradable on `chain`.
    async fn tokens(&self, chain: ChainIndex) -> Result<Vec<Token>, DexError>;

    /// Lists the liquidity sources available on `chain`.
    async fn liquidity_sources(&self, chain: ChainIndex) -> Result<Vec<LiquiditySource>, DexError>;

    /// Returns the approval payload (and the spender) for `token` and a raw `amount`.
    async fn approve_transaction(
        &self,
        chain: ChainIndex,
        token: &str,
        amount: U256,
    ) -> Result<ApproveTransaction, DexError>;

    /// Returns the best route for a swap.
    async fn quote(&self, request: &QuoteRequest) -> Result<RouterResult, DexError>;

    /// Returns the route plus an unsigned transaction payload.
    async fn swap(&self, request: &SwapRequest) -> Result<SwapInfo, DexError>;

    /// Returns the balances of specific tokens held by `address`.
    async fn token_balances(
        &self,
        address: &str,
        tokens: &[TokenBalanceRequestItem],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, DexError>;

    /// Returns every token balance held by `address` on `chains`.
    async fn all_token_balances(
        &self,
        address: &str,
        chains: &[ChainIndex],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, DexError>;

    /// Submits a signed transaction through the aggregator and returns its order id.
    async fn broadcast_transaction(&self, request: &BroadcastRequest) -> Result<String, DexError>;

    /// Looks up broadcast orders.
    async fn transaction_orders(
        &self,
        query: &OrdersQuery,
    ) -> Result<Vec<TransactionOrder>, DexError>;

    /// Returns the latest price of a token.
    async fn token_price(&self, chain: ChainIndex, token: &str) -> Result<TokenPrice, DexError>;

    /// Returns the daily price of a token on `date`, if the aggregator has one.
    async fn historical_price(
        &self,
        chain: ChainIndex,
        token: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, DexError>;
}
