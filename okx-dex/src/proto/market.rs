//! Catalog, balance, price and order records returned by the aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, VecSkipError, serde_as};

use crate::amount::{self, AmountError};
use crate::chain::ChainIndex;
use alloy_primitives::U256;

/// A chain supported by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// Aggregator chain index.
    #[serde(alias = "chainIndex")]
    pub chain_id: ChainIndex,
    /// Chain name.
    pub chain_name: String,
    /// Address that must be approved to spend tokens on EVM chains.
    #[serde(default)]
    pub dex_token_approve_address: Option<String>,
}

/// A token listed on a chain.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Token precision.
    #[serde_as(as = "DisplayFromStr")]
    pub decimals: u8,
    /// Token contract / mint address.
    pub token_contract_address: String,
    /// Logo URL.
    #[serde(default)]
    pub token_logo_url: String,
    /// Full token name.
    #[serde(default)]
    pub token_name: String,
    /// Token symbol.
    pub token_symbol: String,
}

/// A liquidity source (DEX) the aggregator can route through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquiditySource {
    /// Aggregator identifier.
    pub id: String,
    /// Logo URL.
    #[serde(default)]
    pub logo: String,
    /// Source name.
    pub name: String,
}

/// One token of a specific-balance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceRequestItem {
    /// Chain of the token.
    pub chain_index: ChainIndex,
    /// Token contract / mint address; empty for the native token.
    pub token_contract_address: String,
}

/// A wallet's holding of one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAsset {
    /// Chain of the token.
    pub chain_index: ChainIndex,
    /// Token contract / mint address; empty for the native token.
    #[serde(default)]
    pub token_contract_address: String,
    /// Token symbol.
    #[serde(default)]
    pub symbol: String,
    /// Balance in human units.
    pub balance: String,
    /// Balance in raw units, when the endpoint reports it.
    #[serde(default)]
    pub raw_balance: Option<String>,
    /// USD price of one token.
    #[serde(default)]
    pub token_price: String,
    /// Whether the aggregator flags the token as risky.
    #[serde(default)]
    pub is_risk_token: bool,
    /// Wallet address.
    #[serde(default)]
    pub address: String,
}

impl TokenAsset {
    /// Returns the balance in raw units.
    ///
    /// Uses the raw balance when present, otherwise converts the human
    /// balance with `decimals`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if neither balance can be converted.
    pub fn raw_amount(&self, decimals: u8) -> Result<U256, AmountError> {
        match self.raw_balance.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .map_err(|_| AmountError::Malformed(raw.to_owned())),
            _ => amount::parse_units(&self.balance, decimals),
        }
    }

    /// USD value of the holding, when both balance and price are numeric.
    #[must_use]
    pub fn value_in_usd(&self) -> Option<Decimal> {
        let balance: Decimal = self.balance.parse().ok()?;
        let price: Decimal = self.token_price.parse().ok()?;
        balance.checked_mul(price)
    }
}

/// Balance response wrapper. Malformed entries are skipped.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalances {
    /// Holdings.
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub token_assets: Vec<TokenAsset>,
}

/// Request body of the broadcast endpoint.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    /// Signed transaction, encoded as the chain expects (base58 on Solana).
    pub signed_tx: String,
    /// Target chain.
    pub chain_index: ChainIndex,
    /// Sender address.
    pub address: Option<String>,
    /// Aggregator account identifier.
    pub account_id: Option<String>,
}

/// Response of the broadcast endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    /// Order identifier used to track the broadcast.
    pub order_id: String,
}

/// Filters for the transaction order lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrdersQuery {
    /// Sender address.
    pub address: Option<String>,
    /// Aggregator account identifier.
    pub account_id: Option<String>,
    /// Chain filter.
    pub chain_index: Option<ChainIndex>,
    /// Status filter (`1` pending, `2` success, `3` failed).
    pub tx_status: Option<String>,
    /// A specific order.
    pub order_id: Option<String>,
    /// Pagination cursor.
    pub cursor: Option<String>,
    /// Page size.
    pub limit: Option<u32>,
}

impl OrdersQuery {
    /// Returns the query parameters that are set.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        [
            ("address", self.address.clone()),
            ("accountId", self.account_id.clone()),
            ("chainIndex", self.chain_index.map(|c| c.to_string())),
            ("txStatus", self.tx_status.clone()),
            ("orderId", self.order_id.clone()),
            ("cursor", self.cursor.clone()),
            ("limit", self.limit.map(|l| l.to_string())),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

/// A broadcast order and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOrder {
    /// Chain of the order.
    pub chain_index: ChainIndex,
    /// Sender address.
    #[serde(default)]
    pub address: String,
    /// Aggregator account identifier.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Order identifier.
    pub order_id: String,
    /// Status (`1` pending, `2` success, `3` failed).
    pub tx_status: String,
    /// On-chain hash, once known.
    #[serde(default)]
    pub tx_hash: String,
}

/// The latest price of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    /// Chain of the token.
    pub chain_index: ChainIndex,
    /// Token contract / mint address.
    pub token_contract_address: String,
    /// Price timestamp in milliseconds.
    pub time: String,
    /// USD price.
    pub price: Decimal,
}

/// One point of a historical price series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Timestamp in milliseconds.
    pub time: String,
    /// USD price.
    pub price: Decimal,
}

/// A historical price series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Points in descending time order.
    #[serde(default)]
    pub prices: Vec<PricePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_token_decimals_from_string() {
        let token: Token = serde_json::from_value(serde_json::json!({
            "decimals": "6",
            "tokenContractAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "tokenLogoUrl": "",
            "tokenName": "USD Coin",
            "tokenSymbol": "USDC"
        }))
        .unwrap();
        assert_eq!(token.decimals, 6);
    }

    #[test]
    fn test_balances_skip_malformed_assets() {
        let balances: TokenBalances = serde_json::from_value(serde_json::json!({
            "tokenAssets": [
                {"chainIndex": "501", "tokenContractAddress": "", "symbol": "SOL",
                 "balance": "1.5", "tokenPrice": "150", "isRiskToken": false,
                 "rawBalance": "1500000000", "address": "wallet"},
                {"symbol": "BROKEN"}
            ]
        }))
        .unwrap();
        assert_eq!(balances.token_assets.len(), 1);
        let asset = &balances.token_assets[0];
        assert_eq!(asset.raw_amount(9).unwrap(), U256::from(1_500_000_000u64));
        assert_eq!(asset.value_in_usd(), Some(Decimal::from(225)));
    }

    #[test]
    fn test_raw_amount_falls_back_to_human_balance() {
        let asset = TokenAsset {
            chain_index: ChainIndex::ETHEREUM,
            token_contract_address: String::new(),
            symbol: "ETH".into(),
            balance: "0.6409".into(),
            raw_balance: Some(String::new()),
            token_price: String::new(),
            is_risk_token: false,
            address: String::new(),
        };
        assert_eq!(
            asset.raw_amount(18).unwrap().to_string(),
            "640900000000000000"
        );
        assert!(asset.value_in_usd().is_none());
    }

    #[test]
    fn test_broadcast_request_omits_unset_fields() {
        let request = BroadcastRequest {
            signed_tx: "abc".into(),
            chain_index: ChainIndex::SOLANA,
            address: None,
            account_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"signedTx": "abc", "chainIndex": "501"}));
    }

    #[test]
    fn test_orders_query_params() {
        let query = OrdersQuery {
            address: Some("wallet".into()),
            chain_index: Some(ChainIndex::SOLANA),
            limit: Some(20),
            ..OrdersQuery::default()
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("address", "wallet".to_owned()),
                ("chainIndex", "501".to_owned()),
                ("limit", "20".to_owned()),
            ]
        );
    }

    #[test]
    fn test_token_price_parses_decimal_string() {
        let price: TokenPrice = serde_json::from_value(serde_json::json!({
            "chainIndex": "1",
            "tokenContractAddress": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            "time": "1716892020000",
            "price": "3559.12"
        }))
        .unwrap();
        assert_eq!(price.price, Decimal::from_str("3559.12").unwrap());
    }
}
