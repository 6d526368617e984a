//! Route quotes and swap payloads returned by the aggregator.
//!
//! Route values are immutable once received. The pipelines never modify them;
//! the methods on [`RouterResult`] only derive display values (execution
//! price, USD value, best venue) from fields already present in the route.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::amount::{self, AmountError};
use crate::chain::ChainIndex;

/// Per-token details attached to a route.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Token precision.
    #[serde_as(as = "DisplayFromStr")]
    pub decimal: u8,
    /// Whether the aggregator flags the token as a honeypot.
    #[serde(default)]
    pub is_honey_pot: bool,
    /// Transfer tax rate as a decimal string.
    #[serde(default)]
    pub tax_rate: String,
    /// Token contract / mint address.
    pub token_contract_address: String,
    /// Token symbol.
    pub token_symbol: String,
    /// Unit price in USD, when the aggregator knows it.
    #[serde(default)]
    pub token_unit_price: Option<String>,
}

impl TokenInfo {
    /// Returns the USD unit price, if present and numeric.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.token_unit_price.as_deref()?.parse().ok()
    }
}

/// One liquidity protocol used by a sub-route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexProtocol {
    /// Protocol name.
    pub dex_name: String,
    /// Share of the sub-route routed through this protocol.
    pub percent: String,
}

/// A hop of a route between two tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRouter {
    /// Protocols used for this hop.
    pub dex_protocol: Vec<DexProtocol>,
    /// Input token of the hop.
    pub from_token: TokenInfo,
    /// Output token of the hop.
    pub to_token: TokenInfo,
}

/// A split of the total route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexRouter {
    /// Router identifier.
    pub router: String,
    /// Share of the input amount routed through this split.
    pub router_percent: String,
    /// Hops of this split.
    #[serde(default)]
    pub sub_router_list: Vec<SubRouter>,
}

/// The aggregator's quote from a single venue, used for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCompare {
    /// Output amount in human units.
    pub amount_out: String,
    /// Venue logo URL.
    #[serde(default)]
    pub dex_logo: String,
    /// Venue name.
    pub dex_name: String,
    /// Fee charged by the venue.
    #[serde(default)]
    pub trade_fee: String,
}

impl QuoteCompare {
    /// Returns the venue's output amount.
    #[must_use]
    pub fn output_amount(&self) -> Option<Decimal> {
        self.amount_out.parse().ok()
    }

    /// Returns the venue price as `input / output`; lower is better.
    ///
    /// An input of zero prices at zero. A venue with a missing or zero output
    /// has no price.
    #[must_use]
    pub fn price(&self, input: Decimal) -> Option<Decimal> {
        if input.is_zero() {
            return Some(Decimal::ZERO);
        }
        input.checked_div(self.output_amount()?)
    }
}

/// A route quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterResult {
    /// Chain the route executes on.
    pub chain_id: ChainIndex,
    /// Route splits.
    #[serde(default)]
    pub dex_router_list: Vec<DexRouter>,
    /// Estimated network fee in the chain's smallest gas unit.
    #[serde(default)]
    pub estimate_gas_fee: String,
    /// Input token.
    pub from_token: TokenInfo,
    /// Input amount in raw units.
    pub from_token_amount: String,
    /// Price impact percentage, when reported.
    #[serde(default, rename = "priceImpactPercentage")]
    pub price_impact_pct: Option<String>,
    /// Competing venue quotes.
    #[serde(default)]
    pub quote_compare_list: Vec<QuoteCompare>,
    /// Output token.
    pub to_token: TokenInfo,
    /// Output amount in raw units.
    pub to_token_amount: String,
    /// Aggregator trade fee.
    #[serde(default)]
    pub trade_fee: String,
    /// Output amount before fees, when reported.
    #[serde(default)]
    pub origin_to_token_amount: Option<String>,
}

impl RouterResult {
    /// Input amount in human units.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the raw amount is not an integer or does not
    /// fit a [`Decimal`].
    pub fn from_amount(&self) -> Result<Decimal, AmountError> {
        amount::to_decimal(&self.from_token_amount, self.from_token.decimal)
    }

    /// Output amount in human units.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the raw amount is not an integer or does not
    /// fit a [`Decimal`].
    pub fn to_amount(&self) -> Result<Decimal, AmountError> {
        amount::to_decimal(&self.to_token_amount, self.to_token.decimal)
    }

    /// Output tokens received per input token; zero when the output is zero.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if either amount cannot be converted.
    pub fn execution_price(&self) -> Result<Decimal, AmountError> {
        let to = self.to_amount()?;
        if to.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(to.checked_div(self.from_amount()?).unwrap_or_default())
    }

    /// USD value of the input, when the input token has a unit price.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the input amount cannot be converted.
    pub fn value_in_usd(&self) -> Result<Option<Decimal>, AmountError> {
        let from = self.from_amount()?;
        Ok(self.from_token.price().and_then(|p| from.checked_mul(p)))
    }

    /// Price impact percentage, when reported.
    #[must_use]
    pub fn price_impact(&self) -> Option<Decimal> {
        self.price_impact_pct.as_deref()?.parse().ok()
    }

    /// Price of each venue (input per output), keyed by venue name.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the input amount cannot be converted.
    pub fn venue_prices(&self) -> Result<BTreeMap<String, Decimal>, AmountError> {
        let input = self.from_amount()?;
        Ok(self
            .quote_compare_list
            .iter()
            .filter_map(|q| q.price(input).map(|p| (q.dex_name.clone(), p)))
            .collect())
    }

    /// The venue with the lowest input-per-output price.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the input amount cannot be converted.
    pub fn best_venue(&self) -> Result<Option<&QuoteCompare>, AmountError> {
        let input = self.from_amount()?;
        Ok(self
            .quote_compare_list
            .iter()
            .filter_map(|q| q.price(input).map(|p| (q, p)))
            .min_by(|a, b| a.1.cmp(&b.1))
            .map(|(q, _)| q))
    }

    /// Human-readable comparison of all venue prices against the best one.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the input amount cannot be converted.
    pub fn price_comparison(&self) -> Result<String, AmountError> {
        let mut prices: Vec<(String, Decimal)> = self.venue_prices()?.into_iter().collect();
        prices.sort_by(|a, b| a.1.cmp(&b.1));
        let Some(best) = prices.first().map(|(_, p)| *p) else {
            return Ok("No prices available".to_owned());
        };

        let pair = format!(
            "{}/{}",
            self.from_token.token_symbol, self.to_token.token_symbol
        );
        let mut report = format!("Best price: {} {pair}\nPrices by venue:\n", best.round_dp(8));
        for (venue, price) in &prices {
            let diff = price
                .checked_div(best)
                .map(|ratio| ((ratio - Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2))
                .unwrap_or_default();
            let sign = if diff.is_sign_negative() { "" } else { "+" };
            let _ = writeln!(report, "  {venue}: {} ({sign}{diff}%)", price.round_dp(8));
        }
        Ok(report)
    }
}

/// Unsigned transaction payload prepared by the aggregator.
///
/// On EVM chains `data` is hex calldata; on Solana it is a base58 serialized
/// versioned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransaction {
    /// Encoded payload.
    pub data: String,
    /// Sender address.
    pub from: String,
    /// Gas limit suggested by the aggregator.
    #[serde(default)]
    pub gas: String,
    /// Gas price suggested by the aggregator.
    #[serde(default)]
    pub gas_price: String,
    /// Priority fee suggested by the aggregator.
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    /// Router contract the transaction calls.
    pub to: String,
    /// Native value sent with the transaction, in raw units.
    #[serde(default)]
    pub value: String,
    /// Minimum output after slippage.
    #[serde(default)]
    pub min_receive_amount: Option<String>,
}

/// Route plus executable payload returned by the swap endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    /// The route being executed.
    pub router_result: RouterResult,
    /// The payload to sign.
    pub tx: SwapTransaction,
}

/// Approval payload returned by the approve endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveTransaction {
    /// Hex calldata for the token contract.
    pub data: String,
    /// Address that must be granted the allowance.
    pub dex_contract_address: String,
    /// Suggested gas limit.
    #[serde(default)]
    pub gas_limit: String,
    /// Suggested gas price.
    #[serde(default)]
    pub gas_price: String,
}

/// A confirmed (or submitted, for unconfirmed ledger sends) swap.
///
/// Only ever constructed after the pipeline reached a terminal success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    /// Transaction hash (EVM) or signature (Solana).
    pub tx_hash: String,
    /// The executed route, echoed unchanged.
    #[serde(flatten)]
    pub route: RouterResult,
}
