//! The multi-chain swap facade.

use alloy_primitives::U256;
use chrono::NaiveDate;
use dashmap::DashMap;
use okx_dex::DexError;
use okx_dex::amount::{apply_percent, check_percent, parse_units};
use okx_dex::api::DexApi;
use okx_dex::chain::{ChainIndex, ChainInfo, chain_info};
use okx_dex::decimals::DecimalsResolver;
use okx_dex::handler::{ApproveParams, ChainHandler, SwapParams};
use okx_dex::proto::{
    Chain, LiquiditySource, OrdersQuery, QuoteRequest, RouterResult, SwapResult, Token,
    TokenAsset, TokenBalanceRequestItem, TokenPrice, TransactionOrder,
};
use okx_dex::signer::SignerKey;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::config::DexConfig;
use crate::factory::{HandlerFactory, RpcHandlerFactory};

/// What to swap, independent of how the amount is sized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrder {
    /// Chain to execute on.
    pub chain: ChainIndex,
    /// Input token address.
    pub from_token: String,
    /// Output token address.
    pub to_token: String,
    /// Slippage tolerance as a fraction (`0.005` is 0.5%).
    pub slippage: Decimal,
    /// Wallet that signs and pays.
    pub wallet: String,
    /// Whether to wait for confirmation where it is optional (Solana).
    pub await_confirmation: bool,
}

impl SwapOrder {
    /// Creates an order that does not wait for optional confirmation.
    #[must_use]
    pub fn new(
        chain: ChainIndex,
        from_token: impl Into<String>,
        to_token: impl Into<String>,
        slippage: Decimal,
        wallet: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            from_token: from_token.into(),
            to_token: to_token.into(),
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

    fn params(&self, amount: U256) -> SwapParams {
        let params = SwapParams::new(
            self.chain,
            self.from_token.clone(),
            self.to_token.clone(),
            amount,
            self.slippage,
            self.wallet.clone(),
        );
        if self.await_confirmation {
            params.with_confirmation()
        } else {
            params
        }
    }
}

/// Routes swaps to per-chain handlers and sizes amounts.
///
/// Owns one handler per chain, built on first use and kept for the life of
/// the client, and the token precision cache. Both caches tolerate
/// concurrent first use: the loser of a build race is dropped.
pub struct DexClient {
    api: Arc<dyn DexApi>,
    factory: Box<dyn HandlerFactory>,
    handlers: DashMap<ChainIndex, Arc<dyn ChainHandler>>,
    decimals: DecimalsResolver,
}

impl fmt::Debug for DexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DexClient")
            .field("handlers", &self.handlers.len())
            .field("decimals", &self.decimals)
            .finish_non_exhaustive()
    }
}

impl DexClient {
    /// Creates a client over an aggregator and a handler factory.
    pub fn new(api: Arc<dyn DexApi>, factory: impl HandlerFactory + 'static) -> Self {
        Self {
            api,
            factory: Box::new(factory),
            handlers: DashMap::new(),
            decimals: DecimalsResolver::new(),
        }
    }

    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::Configuration`] if the aggregator client cannot be
    /// built.
    pub fn from_config(config: &DexConfig) -> Result<Self, DexError> {
        let api = config
            .api
            .build_client()
            .map_err(|e| DexError::Configuration(e.to_string()))?;
        Ok(Self::new(
            Arc::new(api),
            RpcHandlerFactory::new(config.chains.clone()),
        ))
    }

    /// Returns the aggregator client.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn DexApi> {
        &self.api
    }

    /// Returns the precision cache.
    #[must_use]
    pub const fn decimals_cache(&self) -> &DecimalsResolver {
        &self.decimals
    }

    /// Returns the handler for `chain`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::UnsupportedChain`] for chains outside the routing
    /// table, or the factory's error.
    pub fn handler(&self, chain: ChainIndex) -> Result<Arc<dyn ChainHandler>, DexError> {
        if let Some(handler) = self.handlers.get(&chain) {
            return Ok(Arc::clone(handler.value()));
        }
        let info = resolve_chain(chain)?;
        let built = self.factory.build(info, Arc::clone(&self.api))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %chain, family = %info.family, "Built chain handler");

        Ok(Arc::clone(self.handlers.entry(chain).or_insert(built).value()))
    }

    /// Returns the precision of `token` on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the chain is unknown or the lookup fails.
    pub async fn get_decimals(&self, chain: ChainIndex, token: &str) -> Result<u8, DexError> {
        let info = resolve_chain(chain)?;
        self.decimals
            .resolve_with(info, token, || async {
                self.handler(chain)?.get_token_decimals(token).await
            })
            .await
    }

    async fn to_raw(&self, chain: ChainIndex, token: &str, amount: &str) -> Result<U256, DexError> {
        let decimals = self.get_decimals(chain, token).await?;
        Ok(parse_units(amount, decimals)?)
    }

    /// Quotes a swap of a human-readable `amount` of `from_token`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the amount cannot be sized or the aggregator
    /// fails.
    #[cfg_attr(feature = "telemetry", instrument(skip(self), err))]
    pub async fn quote(
        &self,
        chain: ChainIndex,
        from_token: &str,
        to_token: &str,
        amount: &str,
        fee_percent: Option<Decimal>,
    ) -> Result<RouterResult, DexError> {
        let raw = self.to_raw(chain, from_token, amount).await?;
        let mut request = QuoteRequest::new(chain, from_token, to_token, raw);
        request.fee_percent = fee_percent;
        self.api.quote(&request).await
    }

    /// Swaps a human-readable `amount` of the order's input token.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] from sizing or from the chain's handler.
    #[cfg_attr(feature = "telemetry", instrument(skip(self, order, signer), fields(chain = %order.chain), err))]
    pub async fn swap(
        &self,
        order: &SwapOrder,
        amount: &str,
        signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError> {
        let raw = self.to_raw(order.chain, &order.from_token, amount).await?;
        self.handler(order.chain)?
            .execute_swap(&order.params(raw), signer)
            .await
    }

    /// Swaps `floor(balance × percent)` of the order's input token.
    ///
    /// The balance comes from the aggregator's balance endpoint; `percent`
    /// must be in `(0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::InvalidAmount`] for a percent outside `(0, 1]`,
    /// [`DexError::ExternalApi`] if no balance is reported, or the handler's
    /// error.
    #[cfg_attr(feature = "telemetry", instrument(skip(self, order, signer), fields(chain = %order.chain), err))]
    pub async fn swap_by_balance_percent(
        &self,
        order: &SwapOrder,
        percent: Decimal,
        signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError> {
        let raw = self
            .balance_share(order.chain, &order.from_token, &order.wallet, percent)
            .await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(%percent, raw = %raw, "Sized swap from balance");

        self.handler(order.chain)?
            .execute_swap(&order.params(raw), signer)
            .await
    }

    /// Like [`Self::swap`], relaying the signed transaction through the
    /// aggregator's broadcast endpoint. Returns the order id.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::NotSupported`] on chains without a relay path.
    pub async fn swap_via_broadcast(
        &self,
        order: &SwapOrder,
        amount: &str,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        let raw = self.to_raw(order.chain, &order.from_token, amount).await?;
        self.handler(order.chain)?
            .broadcast_swap(&order.params(raw), signer)
            .await
    }

    /// Approves a human-readable `amount` of `token` for the aggregator's
    /// router and returns the transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::NotSupported`] on chains without allowances, or
    /// the handler's error.
    pub async fn approve(
        &self,
        chain: ChainIndex,
        token: &str,
        amount: &str,
        wallet: &str,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        let raw = self.to_raw(chain, token, amount).await?;
        let params = ApproveParams {
            chain,
            token: token.to_owned(),
            amount: raw,
            wallet: wallet.to_owned(),
        };
        self.handler(chain)?.approve(&params, signer).await
    }

    /// Balances of specific tokens held by `wallet` on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn get_balances(
        &self,
        chain: ChainIndex,
        wallet: &str,
        tokens: &[&str],
    ) -> Result<Vec<TokenAsset>, DexError> {
        let items = tokens
            .iter()
            .map(|token| TokenBalanceRequestItem {
                chain_index: chain,
                token_contract_address: (*token).to_owned(),
            })
            .collect::<Vec<_>>();
        self.api.token_balances(wallet, &items, true).await
    }

    /// Every token balance held by `wallet` on `chains`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn get_all_balances(
        &self,
        chains: &[ChainIndex],
        wallet: &str,
    ) -> Result<Vec<TokenAsset>, DexError> {
        self.api.all_token_balances(wallet, chains, true).await
    }

    /// Chains the aggregator routes on.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn supported_chains(&self) -> Result<Vec<Chain>, DexError> {
        self.api.supported_chains().await
    }

    /// Tokens tradable on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn tokens(&self, chain: ChainIndex) -> Result<Vec<Token>, DexError> {
        self.api.tokens(chain).await
    }

    /// Liquidity sources on `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn liquidity_sources(
        &self,
        chain: ChainIndex,
    ) -> Result<Vec<LiquiditySource>, DexError> {
        self.api.liquidity_sources(chain).await
    }

    /// Latest price of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn token_price(&self, chain: ChainIndex, token: &str) -> Result<TokenPrice, DexError> {
        self.api.token_price(chain, token).await
    }

    /// Daily price of `token` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn historical_price(
        &self,
        chain: ChainIndex,
        token: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, DexError> {
        self.api.historical_price(chain, token, date).await
    }

    /// Broadcast orders matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError`] if the aggregator fails.
    pub async fn transaction_orders(
        &self,
        query: &OrdersQuery,
    ) -> Result<Vec<TransactionOrder>, DexError> {
        self.api.transaction_orders(query).await
    }

    async fn balance_share(
        &self,
        chain: ChainIndex,
        token: &str,
        wallet: &str,
        percent: Decimal,
    ) -> Result<U256, DexError> {
        check_percent(percent)?;
        let info = resolve_chain(chain)?;
        let assets = self.get_balances(chain, wallet, &[token]).await?;
        let wanted = info.normalize_address(token);
        let asset = assets
            .iter()
            .find(|a| info.normalize_address(&a.token_contract_address) == wanted)
            .ok_or_else(|| DexError::external(format!("no balance reported for {token}")))?;

        let decimals = self.get_decimals(chain, token).await?;
        let balance = asset.raw_amount(decimals)?;
        Ok(apply_percent(balance, percent)?)
    }
}

fn resolve_chain(chain: ChainIndex) -> Result<&'static ChainInfo, DexError> {
    chain_info(chain).ok_or(DexError::UnsupportedChain(chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use okx_dex::chain::{EVM_NATIVE_TOKEN, SOLANA_NATIVE_TOKEN};
    use okx_dex::proto::{ApproveTransaction, BroadcastRequest, SwapInfo, SwapRequest};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    const USDC_SOL: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn route(amount: U256) -> RouterResult {
        serde_json::from_value(serde_json::json!({
            "chainId": "501",
            "dexRouterList": [],
            "estimateGasFee": "5000",
            "fromToken": {
                "decimal": "9", "isHoneyPot": false, "taxRate": "0",
                "tokenContractAddress": SOLANA_NATIVE_TOKEN, "tokenSymbol": "SOL",
                "tokenUnitPrice": "150"
            },
            "fromTokenAmount": amount.to_string(),
            "quoteCompareList": [],
            "toToken": {
                "decimal": "6", "isHoneyPot": false, "taxRate": "0",
                "tokenContractAddress": USDC_SOL, "tokenSymbol": "USDC", "tokenUnitPrice": "1"
            },
            "toTokenAmount": "1500000",
            "tradeFee": "0.001"
        }))
        .unwrap()
    }

    /// Records calls and serves a fixed balance.
    #[derive(Default)]
    struct FakeApi {
        quotes: Mutex<Vec<QuoteRequest>>,
        balance: Mutex<Option<TokenAsset>>,
        balance_queries: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DexApi for FakeApi {
        async fn supported_chains(&self) -> Result<Vec<Chain>, DexError> {
            Ok(Vec::new())
        }

        async fn tokens(&self, _chain: ChainIndex) -> Result<Vec<Token>, DexError> {
            Ok(Vec::new())
        }

        async fn liquidity_sources(
            &self,
            _chain: ChainIndex,
        ) -> Result<Vec<LiquiditySource>, DexError> {
            Ok(Vec::new())
        }

        async fn approve_transaction(
            &self,
            _chain: ChainIndex,
            _token: &str,
            _amount: U256,
        ) -> Result<ApproveTransaction, DexError> {
            Err(DexError::external("unexpected approve"))
        }

        async fn quote(&self, request: &QuoteRequest) -> Result<RouterResult, DexError> {
            self.quotes.lock().unwrap().push(request.clone());
            Ok(route(request.amount))
        }

        async fn swap(&self, _request: &SwapRequest) -> Result<SwapInfo, DexError> {
            Err(DexError::external("unexpected swap"))
        }

        async fn token_balances(
            &self,
            _address: &str,
            _tokens: &[TokenBalanceRequestItem],
            _exclude_risk: bool,
        ) -> Result<Vec<TokenAsset>, DexError> {
            self.balance_queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.balance.lock().unwrap().clone().into_iter().collect())
        }

        async fn all_token_balances(
            &self,
            _address: &str,
            _chains: &[ChainIndex],
            _exclude_risk: bool,
        ) -> Result<Vec<TokenAsset>, DexError> {
            Ok(Vec::new())
        }

        async fn broadcast_transaction(
            &self,
            _request: &BroadcastRequest,
        ) -> Result<String, DexError> {
            Err(DexError::external("unexpected broadcast"))
        }

        async fn transaction_orders(
            &self,
            _query: &OrdersQuery,
        ) -> Result<Vec<TransactionOrder>, DexError> {
            Ok(Vec::new())
        }

        async fn token_price(
            &self,
            _chain: ChainIndex,
            _token: &str,
        ) -> Result<TokenPrice, DexError> {
            Err(DexError::external("unexpected price lookup"))
        }

        async fn historical_price(
            &self,
            _chain: ChainIndex,
            _token: &str,
            _date: NaiveDate,
        ) -> Result<Option<Decimal>, DexError> {
            Ok(None)
        }
    }

    /// Handler that records swaps and counts decimals lookups.
    struct RecordingHandler {
        chain: &'static ChainInfo,
        decimals: u8,
        lookups: Arc<AtomicUsize>,
        swaps: Arc<Mutex<Vec<SwapParams>>>,
    }

    #[async_trait::async_trait]
    impl ChainHandler for RecordingHandler {
        fn chain(&self) -> &'static ChainInfo {
            self.chain
        }

        async fn execute_swap(
            &self,
            params: &SwapParams,
            _signer: Option<&SignerKey>,
        ) -> Result<SwapResult, DexError> {
            self.swaps.lock().unwrap().push(params.clone());
            Ok(SwapResult {
                tx_hash: "sig".into(),
                route: route(params.amount),
            })
        }

        async fn approve(
            &self,
            params: &ApproveParams,
            _signer: Option<&SignerKey>,
        ) -> Result<String, DexError> {
            Ok(format!("approved {}", params.amount))
        }

        async fn get_token_decimals(&self, _token: &str) -> Result<u8, DexError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.decimals)
        }
    }

    #[derive(Default, Clone)]
    struct RecordingFactory {
        builds: Arc<AtomicUsize>,
        lookups: Arc<AtomicUsize>,
        swaps: Arc<Mutex<Vec<SwapParams>>>,
    }

    impl HandlerFactory for RecordingFactory {
        fn build(
            &self,
            chain: &'static ChainInfo,
            _api: Arc<dyn DexApi>,
        ) -> Result<Arc<dyn ChainHandler>, DexError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(RecordingHandler {
                chain,
                decimals: 6,
                lookups: Arc::clone(&self.lookups),
                swaps: Arc::clone(&self.swaps),
            }))
        }
    }

    fn client() -> (DexClient, Arc<FakeApi>, RecordingFactory) {
        let api = Arc::new(FakeApi::default());
        let factory = RecordingFactory::default();
        let shared: Arc<dyn DexApi> = Arc::<FakeApi>::clone(&api);
        let client = DexClient::new(shared, factory.clone());
        (client, api, factory)
    }

    #[tokio::test]
    async fn test_decimals_are_looked_up_once_per_chain_and_token() {
        let (client, _api, factory) = client();

        assert_eq!(client.get_decimals(ChainIndex::BASE, USDC_BASE).await.unwrap(), 6);
        let lowercase = USDC_BASE.to_ascii_lowercase();
        assert_eq!(client.get_decimals(ChainIndex::BASE, &lowercase).await.unwrap(), 6);
        assert_eq!(factory.lookups.load(Ordering::SeqCst), 1);

        // Same address on another chain is a different token.
        client.get_decimals(ChainIndex::ARBITRUM, USDC_BASE).await.unwrap();
        assert_eq!(factory.lookups.load(Ordering::SeqCst), 2);

        // Native tokens never hit the chain.
        assert_eq!(
            client.get_decimals(ChainIndex::BASE, EVM_NATIVE_TOKEN).await.unwrap(),
            18
        );
        assert_eq!(factory.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_quote_converts_human_amount() {
        let (client, api, _factory) = client();
        let route = client
            .quote(ChainIndex::SOLANA, SOLANA_NATIVE_TOKEN, USDC_SOL, "0.01", None)
            .await
            .unwrap();

        let request = api.quotes.lock().unwrap()[0].clone();
        assert_eq!(request.amount, U256::from(10_000_000u64));
        assert_eq!(route.from_amount().unwrap(), Decimal::new(1, 2));
        assert_eq!(route.execution_price().unwrap(), Decimal::from(150));
    }

    #[tokio::test]
    async fn test_balance_percent_sizing() {
        let (client, api, factory) = client();
        *api.balance.lock().unwrap() = Some(TokenAsset {
            chain_index: ChainIndex::SOLANA,
            token_contract_address: USDC_SOL.into(),
            symbol: "USDC".into(),
            balance: "1".into(),
            raw_balance: None,
            token_price: "1".into(),
            is_risk_token: false,
            address: "wallet".into(),
        });
        let order = SwapOrder::new(
            ChainIndex::SOLANA,
            USDC_SOL,
            SOLANA_NATIVE_TOKEN,
            Decimal::new(5, 3),
            "wallet",
        );

        client
            .swap_by_balance_percent(&order, Decimal::ONE, None)
            .await
            .unwrap();
        client
            .swap_by_balance_percent(&order, Decimal::new(333, 3), None)
            .await
            .unwrap();

        let swaps = factory.swaps.lock().unwrap().clone();
        assert_eq!(swaps[0].amount, U256::from(1_000_000u64));
        assert_eq!(swaps[1].amount, U256::from(333_000u64));

        assert_eq!(api.balance_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_percent_fails_before_balance_lookup() {
        let (client, api, factory) = client();
        let order = SwapOrder::new(ChainIndex::SOLANA, USDC_SOL, SOLANA_NATIVE_TOKEN, Decimal::ONE, "w");
        for percent in [Decimal::new(15, 1), Decimal::ZERO, Decimal::NEGATIVE_ONE] {
            assert!(matches!(
                client.swap_by_balance_percent(&order, percent, None).await,
                Err(DexError::InvalidAmount(_))
            ));
        }
        assert_eq!(api.balance_queries.load(Ordering::SeqCst), 0);
        assert!(factory.swaps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_balance_is_reported() {
        let (client, _api, _factory) = client();
        let order = SwapOrder::new(ChainIndex::SOLANA, USDC_SOL, SOLANA_NATIVE_TOKEN, Decimal::ONE, "w");
        assert!(matches!(
            client.swap_by_balance_percent(&order, Decimal::ONE, None).await,
            Err(DexError::ExternalApi { .. })
        ));
    }

    #[tokio::test]
    async fn test_balance_of_another_token_is_not_used() {
        let (client, api, factory) = client();
        *api.balance.lock().unwrap() = Some(TokenAsset {
            chain_index: ChainIndex::SOLANA,
            token_contract_address: SOLANA_NATIVE_TOKEN.into(),
            symbol: "SOL".into(),
            balance: "3".into(),
            raw_balance: None,
            token_price: "150".into(),
            is_risk_token: false,
            address: "wallet".into(),
        });
        let order = SwapOrder::new(ChainIndex::SOLANA, USDC_SOL, SOLANA_NATIVE_TOKEN, Decimal::ONE, "wallet");
        assert!(matches!(
            client.swap_by_balance_percent(&order, Decimal::ONE, None).await,
            Err(DexError::ExternalApi { .. })
        ));
        assert!(factory.swaps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_swap_passes_raw_amount_and_confirmation() {
        let (client, _api, factory) = client();
        let order = SwapOrder::new(
            ChainIndex::SOLANA,
            SOLANA_NATIVE_TOKEN,
            USDC_SOL,
            Decimal::new(5, 3),
            "wallet",
        )
        .with_confirmation();
        let result = client.swap(&order, "0.01", None).await.unwrap();
        assert_eq!(result.tx_hash, "sig");

        let swap = factory.swaps.lock().unwrap()[0].clone();
        assert_eq!(swap.amount, U256::from(10_000_000u64));
        assert!(swap.await_confirmation);
        assert_eq!(swap.slippage, Decimal::new(5, 3));
    }

    #[tokio::test]
    async fn test_approve_converts_amount() {
        let (client, _api, _factory) = client();
        let hash = client
            .approve(ChainIndex::BASE, USDC_BASE, "2.5", "0xwallet", None)
            .await
            .unwrap();
        assert_eq!(hash, "approved 2500000");
    }

    #[tokio::test]
    async fn test_handler_is_built_once_per_chain() {
        let (client, _api, factory) = client();
        let first = client.handler(ChainIndex::BASE).unwrap();
        let second = client.handler(ChainIndex::BASE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        client.handler(ChainIndex::SOLANA).unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_chain_is_unsupported() {
        let (client, _api, factory) = client();
        let unknown = ChainIndex::new(999_999);
        assert!(matches!(
            client.handler(unknown),
            Err(DexError::UnsupportedChain(chain)) if chain == unknown
        ));
        assert!(matches!(
            client.quote(unknown, "a", "b", "1", None).await,
            Err(DexError::UnsupportedChain(_))
        ));
        assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_amount() {
        let (client, _api, _factory) = client();
        assert!(matches!(
            client
                .quote(ChainIndex::BASE, USDC_BASE, EVM_NATIVE_TOKEN, "1,5", None)
                .await,
            Err(DexError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_rpc_factory_requires_chain_settings() {
        let client = DexClient::new(
            Arc::new(FakeApi::default()),
            RpcHandlerFactory::default(),
        );
        assert!(matches!(
            client.handler(ChainIndex::BASE),
            Err(DexError::Configuration(_))
        ));
        assert!(matches!(
            client.handler(ChainIndex::SOLANA),
            Err(DexError::Configuration(_))
        ));

        let sui = client.handler(ChainIndex::SUI).unwrap();
        assert!(matches!(
            sui.get_token_decimals("0x2::sui::SUI").await,
            Err(DexError::NotSupported { .. })
        ));
    }
}
