//! Aggregator wire types.
//!
//! Everything the aggregator returns is camelCase JSON, and most numbers are
//! transported as strings. Response records live in [`route`] (quotes and
//! swap payloads) and [`market`] (catalog, balances, prices, orders); the
//! request types for the two routing endpoints are defined here.

pub mod market;
pub mod route;

pub use market::*;
pub use route::*;

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::chain::ChainIndex;

/// Parameters of a route quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    /// Chain to route on.
    pub chain: ChainIndex,
    /// Input token address.
    pub from_token: String,
    /// Output token address.
    pub to_token: String,
    /// Input amount in raw units.
    pub amount: U256,
    /// Referral fee percentage, if any.
    pub fee_percent: Option<Decimal>,
}

impl QuoteRequest {
    /// Creates a quote request without a referral fee.
    #[must_use]
    pub fn new(
        chain: ChainIndex,
        from_token: impl Into<String>,
        to_token: impl Into<String>,
        amount: U256,
    ) -> Self {
        Self {
            chain,
            from_token: from_token.into(),
            to_token: to_token.into(),
            amount,
            fee_percent: None,
        }
    }

    /// Returns the query string parameters of the quote endpoint.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("chainId", self.chain.to_string()),
            ("fromTokenAddress", self.from_token.clone()),
            ("toTokenAddress", self.to_token.clone()),
            ("amount", self.amount.to_string()),
        ];
        if let Some(fee) = self.fee_percent {
            params.push(("feePercent", fee.normalize().to_string()));
        }
        params
    }
}

/// Parameters of a swap payload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    /// The route to execute.
    pub quote: QuoteRequest,
    /// Slippage tolerance as a fraction (`0.005` is 0.5%).
    pub slippage: Decimal,
    /// Wallet that signs and pays for the swap.
    pub user_wallet_address: String,
}

impl SwapRequest {
    /// Returns the query string parameters of the swap endpoint.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.quote.to_params();
        params.push(("slippage", self.slippage.normalize().to_string()));
        params.push(("userWalletAddress", self.user_wallet_address.clone()));
        params
    }
}
