//! Endpoint paths and header names of the aggregator REST API.

/// Production base URL.
pub const DEFAULT_BASE_URL: &str = "https://web3.okx.com";

/// Chains the aggregator routes on.
pub const SUPPORTED_CHAINS_PATH: &str = "/api/v5/dex/aggregator/supported/chain";
/// Tokens tradable on a chain.
pub const ALL_TOKENS_PATH: &str = "/api/v5/dex/aggregator/all-tokens";
/// Liquidity sources on a chain.
pub const LIQUIDITY_PATH: &str = "/api/v5/dex/aggregator/get-liquidity";
/// ERC-20 approval payload.
pub const APPROVE_TRANSACTION_PATH: &str = "/api/v5/dex/aggregator/approve-transaction";
/// Route quote.
pub const QUOTE_PATH: &str = "/api/v5/dex/aggregator/quote";
/// Route plus unsigned transaction.
pub const SWAP_PATH: &str = "/api/v5/dex/aggregator/swap";
/// Balances of specific tokens.
pub const TOKEN_BALANCES_PATH: &str = "/api/v5/dex/balance/token-balances-by-address";
/// Every token balance of an address.
pub const ALL_TOKEN_BALANCES_PATH: &str = "/api/v5/dex/balance/all-token-balances-by-address";
/// Relay a signed transaction.
pub const BROADCAST_TRANSACTION_PATH: &str = "/api/v5/wallet/pre-transaction/broadcast-transaction";
/// Broadcast order status.
pub const TRANSACTION_ORDERS_PATH: &str = "/api/v5/wallet/post-transaction/orders";
/// Latest token price.
pub const TOKEN_PRICE_PATH: &str = "/api/v5/dex/market/price";
/// Historical token price.
pub const HISTORICAL_PRICE_PATH: &str = "/api/v5/dex/index/historical-price";

/// API key header.
pub const ACCESS_KEY_HEADER: &str = "OK-ACCESS-KEY";
/// Request signature header.
pub const ACCESS_SIGN_HEADER: &str = "OK-ACCESS-SIGN";
/// Request timestamp header.
pub const ACCESS_TIMESTAMP_HEADER: &str = "OK-ACCESS-TIMESTAMP";
/// API passphrase header.
pub const ACCESS_PASSPHRASE_HEADER: &str = "OK-ACCESS-PASSPHRASE";
/// Project identifier header.
pub const ACCESS_PROJECT_HEADER: &str = "OK-ACCESS-PROJECT";
