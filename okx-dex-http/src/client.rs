//! A [`DexApi`] implementation that talks to the aggregator over HTTP.
//!
//! ## Features
//!
//! - Uses `reqwest` for async HTTP requests, with an optional proxy
//! - Signs every request (see [`crate::auth`])
//! - Caches the supported-chains catalog with a TTL
//! - Integrates with `tracing` if the `telemetry` feature is enabled
//!
//! ## Error Handling
//!
//! [`ApiClientError`] captures URL construction, transport, status, envelope
//! and payload failures. It converts into [`DexError`] at the [`DexApi`]
//! boundary.

use alloy_primitives::U256;
use chrono::{NaiveDate, Utc};
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use okx_dex::DexError;
use okx_dex::api::DexApi;
use okx_dex::chain::ChainIndex;
use okx_dex::proto::{
    ApproveTransaction, BroadcastRequest, BroadcastResult, Chain, LiquiditySource, OrdersQuery,
    PriceHistory, QuoteRequest, RouterResult, SwapInfo, SwapRequest, Token, TokenAsset,
    TokenBalanceRequestItem, TokenBalances, TokenPrice, TransactionOrder,
};
use reqwest::{Client, Proxy};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::auth::{self, Credentials};
use crate::constants::{
    ACCESS_KEY_HEADER, ACCESS_PASSPHRASE_HEADER, ACCESS_PROJECT_HEADER, ACCESS_SIGN_HEADER,
    ACCESS_TIMESTAMP_HEADER, ALL_TOKEN_BALANCES_PATH, ALL_TOKENS_PATH, APPROVE_TRANSACTION_PATH,
    BROADCAST_TRANSACTION_PATH, DEFAULT_BASE_URL, HISTORICAL_PRICE_PATH, LIQUIDITY_PATH,
    QUOTE_PATH, SUPPORTED_CHAINS_PATH, SWAP_PATH, TOKEN_BALANCES_PATH, TOKEN_PRICE_PATH,
    TRANSACTION_ORDERS_PATH,
};
use crate::envelope::ApiEnvelope;
use crate::error::ApiClientError;

/// TTL cache for the supported-chains catalog.
///
/// Each clone has an independent cache state.
#[derive(Debug)]
pub struct ChainsCache {
    ttl: Duration,
    state: RwLock<Option<(Vec<Chain>, Instant)>>,
}

impl ChainsCache {
    /// Creates a new cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached catalog if still valid.
    pub async fn get(&self) -> Option<Vec<Chain>> {
        let guard = self.state.read().await;
        let (chains, expires_at) = guard.as_ref()?;
        (Instant::now() < *expires_at).then(|| chains.clone())
    }

    /// Stores a catalog with the configured TTL.
    pub async fn set(&self, chains: Vec<Chain>) {
        *self.state.write().await = Some((chains, Instant::now() + self.ttl));
    }

    /// Clears the cache.
    pub async fn clear(&self) {
        *self.state.write().await = None;
    }
}

impl Clone for ChainsCache {
    fn clone(&self) -> Self {
        Self::new(self.ttl)
    }
}

/// Request body of the specific-token balance endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesBody<'a> {
    address: &'a str,
    token_contract_addresses: &'a [TokenBalanceRequestItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_risk_token: Option<&'static str>,
}

/// Request body of the token price endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPriceBody<'a> {
    chain_index: ChainIndex,
    token_contract_address: &'a str,
}

/// A signed client for the aggregator REST API.
#[derive(Clone, Debug)]
pub struct OkxApiClient {
    /// Base URL (e.g. `https://web3.okx.com`)
    base_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Signing credentials
    credentials: Credentials,
    /// Optional request timeout
    timeout: Option<Duration>,
    /// Cache for the supported-chains catalog
    chains_cache: ChainsCache,
}

impl OkxApiClient {
    /// Default TTL of the supported-chains cache (10 minutes).
    pub const DEFAULT_CHAINS_CACHE_TTL: Duration = Duration::from_secs(600);

    /// Constructs a client for `base_url`.
    #[must_use]
    pub fn new(base_url: Url, credentials: Credentials) -> Self {
        Self {
            base_url,
            client: Client::new(),
            credentials,
            timeout: None,
            chains_cache: ChainsCache::new(Self::DEFAULT_CHAINS_CACHE_TTL),
        }
    }

    /// Constructs a client from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::UrlParse`] if `base_url` is not a valid URL.
    pub fn try_new(base_url: &str, credentials: Credentials) -> Result<Self, ApiClientError> {
        let url = Url::parse(base_url).map_err(|e| ApiClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Ok(Self::new(url, credentials))
    }

    /// Constructs a client for the production endpoint.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`Self::try_new`].
    pub fn production(credentials: Credentials) -> Result<Self, ApiClientError> {
        Self::try_new(DEFAULT_BASE_URL, credentials)
    }

    /// Routes all requests through an HTTP proxy.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::Http`] if the proxy URL is invalid or the
    /// client cannot be built.
    pub fn with_proxy(mut self, proxy: &str) -> Result<Self, ApiClientError> {
        let context = "Failed to configure proxy";
        let proxy = Proxy::all(proxy).map_err(|e| ApiClientError::Http { context, source: e })?;
        self.client = Client::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| ApiClientError::Http { context, source: e })?;
        Ok(self)
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the TTL of the supported-chains cache.
    #[must_use]
    pub fn with_chains_cache_ttl(mut self, ttl: Duration) -> Self {
        self.chains_cache = ChainsCache::new(ttl);
        self
    }

    /// Disables caching of the supported-chains catalog.
    #[must_use]
    pub fn without_chains_cache(self) -> Self {
        self.with_chains_cache_ttl(Duration::ZERO)
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns a reference to the supported-chains cache.
    #[must_use]
    pub const fn chains_cache(&self) -> &ChainsCache {
        &self.chains_cache
    }

    /// Lists supported chains, served from the cache when valid.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn supported_chains(&self) -> Result<Vec<Chain>, ApiClientError> {
        if let Some(chains) = self.chains_cache.get().await {
            return Ok(chains);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!("okx_dex.api.chains_cache_miss");

        let chains = self.supported_chains_inner().await?;
        self.chains_cache.set(chains.clone()).await;
        Ok(chains)
    }

    /// Lists supported chains, always making a request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn supported_chains_inner(&self) -> Result<Vec<Chain>, ApiClientError> {
        self.get_items(SUPPORTED_CHAINS_PATH, &[], "GET /supported/chain")
            .await
    }

    /// Lists tokens tradable on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn tokens(&self, chain: ChainIndex) -> Result<Vec<Token>, ApiClientError> {
        self.get_items(
            ALL_TOKENS_PATH,
            &[("chainId", chain.to_string())],
            "GET /all-tokens",
        )
        .await
    }

    /// Lists liquidity sources on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn liquidity_sources(
        &self,
        chain: ChainIndex,
    ) -> Result<Vec<LiquiditySource>, ApiClientError> {
        self.get_items(
            LIQUIDITY_PATH,
            &[("chainId", chain.to_string())],
            "GET /get-liquidity",
        )
        .await
    }

    /// Fetches the approval payload and spender for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails or returns no payload.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "okx_dex.api.approve_transaction", skip(self), err)
    )]
    pub async fn approve_transaction(
        &self,
        chain: ChainIndex,
        token: &str,
        amount: U256,
    ) -> Result<ApproveTransaction, ApiClientError> {
        let params = [
            ("chainId", chain.to_string()),
            ("tokenContractAddress", token.to_owned()),
            ("approveAmount", amount.to_string()),
        ];
        self.get_first(APPROVE_TRANSACTION_PATH, &params, "GET /approve-transaction")
            .await
    }

    /// Fetches a route quote.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails or returns no route.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "okx_dex.api.quote", skip_all, fields(chain = %request.chain), err)
    )]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<RouterResult, ApiClientError> {
        self.get_first(QUOTE_PATH, &request.to_params(), "GET /quote")
            .await
    }

    /// Fetches a route plus unsigned transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails or returns no payload.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "okx_dex.api.swap", skip_all, fields(chain = %request.quote.chain), err)
    )]
    pub async fn swap(&self, request: &SwapRequest) -> Result<SwapInfo, ApiClientError> {
        self.get_first(SWAP_PATH, &request.to_params(), "GET /swap")
            .await
    }

    /// Fetches balances of specific tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn token_balances(
        &self,
        address: &str,
        tokens: &[TokenBalanceRequestItem],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, ApiClientError> {
        let body = TokenBalancesBody {
            address,
            token_contract_addresses: tokens,
            exclude_risk_token: (!exclude_risk).then_some("1"),
        };
        let balances: Vec<TokenBalances> = self
            .post_items(TOKEN_BALANCES_PATH, &body, "POST /token-balances-by-address")
            .await?;
        Ok(flatten_assets(balances))
    }

    /// Fetches every token balance of `address` on `chains`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn all_token_balances(
        &self,
        address: &str,
        chains: &[ChainIndex],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, ApiClientError> {
        let chains = chains
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut params = vec![("address", address.to_owned()), ("chains", chains)];
        if !exclude_risk {
            params.push(("excludeRiskToken", "1".to_owned()));
        }
        let balances: Vec<TokenBalances> = self
            .get_items(
                ALL_TOKEN_BALANCES_PATH,
                &params,
                "GET /all-token-balances-by-address",
            )
            .await?;
        Ok(flatten_assets(balances))
    }

    /// Relays a signed transaction and returns its order id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails or returns no order.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "okx_dex.api.broadcast", skip_all, fields(chain = %request.chain_index), err)
    )]
    pub async fn broadcast_transaction(
        &self,
        request: &BroadcastRequest,
    ) -> Result<String, ApiClientError> {
        let result: BroadcastResult = self
            .post_first(
                BROADCAST_TRANSACTION_PATH,
                request,
                "POST /broadcast-transaction",
            )
            .await?;
        Ok(result.order_id)
    }

    /// Looks up broadcast orders.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn transaction_orders(
        &self,
        query: &OrdersQuery,
    ) -> Result<Vec<TransactionOrder>, ApiClientError> {
        self.get_items(TRANSACTION_ORDERS_PATH, &query.to_params(), "GET /orders")
            .await
    }

    /// Fetches the latest price of a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails or returns no price.
    pub async fn token_price(
        &self,
        chain: ChainIndex,
        token: &str,
    ) -> Result<TokenPrice, ApiClientError> {
        let body = TokenPriceBody {
            chain_index: chain,
            token_contract_address: token,
        };
        self.post_first(TOKEN_PRICE_PATH, &body, "POST /market/price")
            .await
    }

    /// Fetches the daily price of a token on `date` (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError`] if the request fails.
    pub async fn historical_price(
        &self,
        chain: ChainIndex,
        token: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ApiClientError> {
        let begin = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis();
        let end = begin + 86_400_000 - 1;
        let params = [
            ("chainIndex", chain.to_string()),
            ("tokenContractAddress", token.to_owned()),
            ("begin", begin.to_string()),
            ("end", end.to_string()),
            ("period", "1d".to_owned()),
            ("limit", "1".to_owned()),
        ];
        let history: Vec<PriceHistory> = self
            .get_items(HISTORICAL_PRICE_PATH, &params, "GET /historical-price")
            .await?;
        Ok(history
            .into_iter()
            .next()
            .and_then(|h| h.prices.into_iter().next())
            .map(|point| point.price))
    }

    async fn get_items<T>(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &'static str,
    ) -> Result<Vec<T>, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.send(Method::GET, path, params, None, context)
            .await?
            .into_items(context)
    }

    async fn get_first<T>(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &'static str,
    ) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.send(Method::GET, path, params, None, context)
            .await?
            .into_first(context)
    }

    async fn post_items<B, T>(
        &self,
        path: &str,
        body: &B,
        context: &'static str,
    ) -> Result<Vec<T>, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)
            .map_err(|source| ApiClientError::JsonSerialization { context, source })?;
        self.send(Method::POST, path, &[], Some(body), context)
            .await?
            .into_items(context)
    }

    async fn post_first<B, T>(
        &self,
        path: &str,
        body: &B,
        context: &'static str,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_items(path, body, context)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiClientError::EmptyData { context })
    }

    /// Signs and sends one request, returning the decoded envelope.
    ///
    /// `context` is a human-readable identifier used in tracing and error
    /// messages (e.g. `"GET /quote"`).
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<String>,
        context: &'static str,
    ) -> Result<ApiEnvelope, ApiClientError> {
        let request_path = auth::request_path(path, params);
        let url = self
            .base_url
            .join(&request_path)
            .map_err(|e| ApiClientError::UrlParse { context, source: e })?;
        let body = body.unwrap_or_default();
        let timestamp = auth::timestamp(Utc::now());
        let signature = self
            .credentials
            .sign(&timestamp, method.as_str(), &request_path, &body)?;

        let mut req = self
            .client
            .request(method, url)
            .header(ACCESS_KEY_HEADER, &self.credentials.api_key)
            .header(ACCESS_SIGN_HEADER, signature)
            .header(ACCESS_TIMESTAMP_HEADER, timestamp)
            .header(ACCESS_PASSPHRASE_HEADER, &self.credentials.passphrase)
            .header(CONTENT_TYPE, "application/json");
        if let Some(project) = &self.credentials.project_id {
            req = req.header(ACCESS_PROJECT_HEADER, project);
        }
        if !body.is_empty() {
            req = req.body(body);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let http_response = req
            .send()
            .await
            .map_err(|e| ApiClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<ApiEnvelope>()
                .await
                .map_err(|e| ApiClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| ApiClientError::ResponseBodyRead { context, source: e })?;
            Err(ApiClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_failure(&result);

        result
    }
}

/// Logs a failed request.
#[cfg(feature = "telemetry")]
fn record_failure<R>(result: &Result<R, ApiClientError>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "Request to aggregator failed");
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
const fn record_failure<R>(_result: &Result<R, ApiClientError>) {}

fn flatten_assets(balances: Vec<TokenBalances>) -> Vec<TokenAsset> {
    balances
        .into_iter()
        .flat_map(|b| b.token_assets)
        .collect()
}

#[async_trait::async_trait]
impl DexApi for OkxApiClient {
    async fn supported_chains(&self) -> Result<Vec<Chain>, DexError> {
        Ok(Self::supported_chains(self).await?)
    }

    async fn tokens(&self, chain: ChainIndex) -> Result<Vec<Token>, DexError> {
        Ok(Self::tokens(self, chain).await?)
    }

    async fn liquidity_sources(&self, chain: ChainIndex) -> Result<Vec<LiquiditySource>, DexError> {
        Ok(Self::liquidity_sources(self, chain).await?)
    }

    async fn approve_transaction(
        &self,
        chain: ChainIndex,
        token: &str,
        amount: U256,
    ) -> Result<ApproveTransaction, DexError> {
        Ok(Self::approve_transaction(self, chain, token, amount).await?)
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<RouterResult, DexError> {
        Ok(Self::quote(self, request).await?)
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapInfo, DexError> {
        Ok(Self::swap(self, request).await?)
    }

    async fn token_balances(
        &self,
        address: &str,
        tokens: &[TokenBalanceRequestItem],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, DexError> {
        Ok(Self::token_balances(self, address, tokens, exclude_risk).await?)
    }

    async fn all_token_balances(
        &self,
        address: &str,
        chains: &[ChainIndex],
        exclude_risk: bool,
    ) -> Result<Vec<TokenAsset>, DexError> {
        Ok(Self::all_token_balances(self, address, chains, exclude_risk).await?)
    }

    async fn broadcast_transaction(&self, request: &BroadcastRequest) -> Result<String, DexError> {
        Ok(Self::broadcast_transaction(self, request).await?)
    }

    async fn transaction_orders(
        &self,
        query: &OrdersQuery,
    ) -> Result<Vec<TransactionOrder>, DexError> {
        Ok(Self::transaction_orders(self, query).await?)
    }

    async fn token_price(&self, chain: ChainIndex, token: &str) -> Result<TokenPrice, DexError> {
        Ok(Self::token_price(self, chain, token).await?)
    }

    async fn historical_price(
        &self,
        chain: ChainIndex,
        token: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, DexError> {
        Ok(Self::historical_price(self, chain, token, date).await?)
    }
}
