//! [`ChainHandler`] for account/nonce chains.

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use okx_dex::DexError;
use okx_dex::api::DexApi;
use okx_dex::chain::{ChainFamily, ChainInfo};
use okx_dex::handler::{ApproveParams, ChainHandler, SwapParams};
use okx_dex::proto::{SwapResult, SwapTransaction};
use okx_dex::signer::SignerKey;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::contract::IERC20;
use crate::pipeline::{FeeMultiplier, TransactionPipeline};
use crate::rpc::{EvmRpc, TransactionDraft};

/// Executes aggregator swaps on one EVM chain.
///
/// ERC-20 swaps are allowance gated: if the router's allowance is below the
/// swap amount, an approval for exactly that amount is sent and confirmed
/// first. Native-token swaps skip the check.
pub struct EvmHandler<R> {
    chain: &'static ChainInfo,
    api: Arc<dyn DexApi>,
    pipeline: TransactionPipeline<R>,
    default_signer: Option<SignerKey>,
}

impl<R> fmt::Debug for EvmHandler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmHandler")
            .field("chain", &self.chain.name)
            .field("default_signer", &self.default_signer)
            .finish_non_exhaustive()
    }
}

impl<R: EvmRpc> EvmHandler<R> {
    /// Creates a handler for `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::Configuration`] if `chain` is not an EVM chain.
    pub fn new(
        chain: &'static ChainInfo,
        api: Arc<dyn DexApi>,
        pipeline: TransactionPipeline<R>,
    ) -> Result<Self, DexError> {
        if chain.family != ChainFamily::Evm {
            return Err(DexError::Configuration(format!(
                "{} is not an EVM chain",
                chain.name
            )));
        }
        Ok(Self {
            chain,
            api,
            pipeline,
            default_signer: None,
        })
    }

    /// Sets the key used when a call does not supply one.
    #[must_use]
    pub fn with_default_signer(mut self, signer: SignerKey) -> Self {
        self.default_signer = Some(signer);
        self
    }

    /// Returns the transaction pipeline.
    pub const fn pipeline(&self) -> &TransactionPipeline<R> {
        &self.pipeline
    }

    fn chain_id(&self) -> u64 {
        self.chain.index.as_u64()
    }

    fn resolve_signer(&self, signer: Option<&SignerKey>) -> Result<PrivateKeySigner, DexError> {
        let key = signer.or(self.default_signer.as_ref()).ok_or_else(|| {
            DexError::Configuration(format!("no signer configured for {}", self.chain.name))
        })?;
        PrivateKeySigner::from_str(key.expose()).map_err(|e| DexError::Signer(e.to_string()))
    }

    /// Resolves the signer and checks that it controls `wallet`.
    ///
    /// Must run before the allowance check; nothing is sent on a mismatch.
    fn signer_for(
        &self,
        signer: Option<&SignerKey>,
        wallet: &str,
    ) -> Result<PrivateKeySigner, DexError> {
        let signer = self.resolve_signer(signer)?;
        let wallet = parse_address("wallet", wallet)?;
        if signer.address() != wallet {
            return Err(DexError::Signer(format!(
                "signer {} does not control wallet {wallet}",
                signer.address()
            )));
        }
        Ok(signer)
    }

    /// Makes sure `spender` may move `amount` of `token` on behalf of `owner`.
    ///
    /// Returns the approval hash if one had to be sent.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        chain = %self.chain.index,
        token = %token,
        amount = %amount
    )))]
    async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
        signer: &PrivateKeySigner,
    ) -> Result<Option<TxHash>, DexError> {
        let owner = signer.address();
        let approval = self
            .api
            .approve_transaction(self.chain.index, &token.to_string(), amount)
            .await?;
        let spender = parse_address("dexContractAddress", &approval.dex_contract_address)?;

        let allowance = self
            .pipeline
            .rpc()
            .allowance(token, owner, spender)
            .await
            .map_err(|e| DexError::Rpc(e.to_string()))?;
        if allowance >= amount {
            #[cfg(feature = "telemetry")]
            tracing::debug!(%allowance, %spender, "Allowance sufficient");
            return Ok(None);
        }

        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        let draft =
            TransactionDraft::new(self.chain_id(), token, Bytes::from(calldata)).with_from(owner);
        let hash = self
            .pipeline
            .send(draft, FeeMultiplier::Approval, signer)
            .await
            .map_err(|e| DexError::InsufficientApproval(Box::new(e)))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(tx = %hash, %spender, "Approval confirmed");
        Ok(Some(hash))
    }

    fn swap_draft(&self, tx: &SwapTransaction) -> Result<TransactionDraft, DexError> {
        let from = parse_address("tx.from", &tx.from)?;
        let to = parse_address("tx.to", &tx.to)?;
        let data = Bytes::from_str(&tx.data)
            .map_err(|e| DexError::external(format!("malformed tx.data: {e}")))?;
        let value = parse_u256("tx.value", &tx.value)?;
        let gas = parse_u64("tx.gas", &tx.gas)?;

        let mut draft = TransactionDraft::new(self.chain_id(), to, data)
            .with_from(from)
            .with_value(value);
        if gas > 0 {
            draft = draft.with_gas_limit(gas.saturating_mul(3) / 2);
        }
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl<R: EvmRpc + 'static> ChainHandler for EvmHandler<R> {
    fn chain(&self) -> &'static ChainInfo {
        self.chain
    }

    async fn execute_swap(
        &self,
        params: &SwapParams,
        signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError> {
        let signer = self.signer_for(signer, &params.wallet)?;

        if !self.chain.is_native_token(&params.from_token) {
            let token = parse_address("fromToken", &params.from_token)?;
            self.ensure_allowance(token, params.amount, &signer).await?;
        }

        let swap = self.api.swap(&params.to_request()).await?;
        let draft = self.swap_draft(&swap.tx)?;
        let hash = self
            .pipeline
            .send(draft, FeeMultiplier::Swap, &signer)
            .await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %self.chain.index, tx = %hash, "Swap confirmed");

        Ok(SwapResult {
            tx_hash: hash.to_string(),
            route: swap.router_result,
        })
    }

    async fn approve(
        &self,
        params: &ApproveParams,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        let signer = self.signer_for(signer, &params.wallet)?;
        let token = parse_address("token", &params.token)?;
        let approval = self
            .api
            .approve_transaction(self.chain.index, &params.token, params.amount)
            .await?;

        let data = Bytes::from_str(&approval.data)
            .map_err(|e| DexError::external(format!("malformed approval data: {e}")))?;
        let mut draft =
            TransactionDraft::new(self.chain_id(), token, data).with_from(signer.address());
        let gas_limit = parse_u64("gasLimit", &approval.gas_limit)?;
        if gas_limit > 0 {
            draft = draft.with_gas_limit(gas_limit);
        }

        let hash = self
            .pipeline
            .send(draft, FeeMultiplier::Approval, &signer)
            .await?;
        Ok(hash.to_string())
    }

    async fn get_token_decimals(&self, token: &str) -> Result<u8, DexError> {
        if self.chain.is_native_token(token) {
            return Ok(self.chain.native_decimals);
        }
        let address = parse_address("token", token)?;
        self.pipeline
            .rpc()
            .decimals(address)
            .await
            .map_err(|e| DexError::Rpc(e.to_string()))
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, DexError> {
    Address::from_str(value.trim())
        .map_err(|e| DexError::Configuration(format!("invalid {field} address {value:?}: {e}")))
}

fn parse_u256(field: &str, value: &str) -> Result<U256, DexError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str(value).map_err(|e| DexError::external(format!("malformed {field}: {e}")))
}

fn parse_u64(field: &str, value: &str) -> Result<u64, DexError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|e| DexError::external(format!("malformed {field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{FakeRpc, FakeState, TEST_KEY, fast_config, test_signer};
    use chrono::NaiveDate;
    use okx_dex::chain::{ChainIndex, EVM_NATIVE_TOKEN, chain_info};
    use okx_dex::proto::{
        ApproveTransaction, BroadcastRequest, Chain, LiquiditySource, OrdersQuery, QuoteRequest,
        RouterResult, SwapInfo, SwapRequest, Token, TokenAsset, TokenBalanceRequestItem,
        TokenPrice, TransactionOrder,
    };
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    const USDC: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    const ROUTER: &str = "0x6b2c0c7be2048daa9b5527982c29f48062b34d58";
    const SPENDER: &str = "0x57df6092665eb6058DE53939612413ff4B09114E";

    fn route() -> RouterResult {
        serde_json::from_value(serde_json::json!({
            "chainId": "8453",
            "dexRouterList": [],
            "estimateGasFee": "120000",
            "fromToken": {
                "decimal": "6", "isHoneyPot": false, "taxRate": "0",
                "tokenContractAddress": USDC, "tokenSymbol": "USDC", "tokenUnitPrice": "1"
            },
            "fromTokenAmount": "1000000",
            "quoteCompareList": [],
            "toToken": {
                "decimal": "18", "isHoneyPot": false, "taxRate": "0",
                "tokenContractAddress": EVM_NATIVE_TOKEN, "tokenSymbol": "ETH",
                "tokenUnitPrice": "2500"
            },
            "toTokenAmount": "400000000000000",
            "tradeFee": "0.01"
        }))
        .unwrap()
    }

    /// Aggregator fake returning fixed approval and swap payloads.
    ///
    /// The swap payload's sender echoes the requested wallet.
    struct FakeApi {
        swaps: Mutex<Vec<SwapRequest>>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                swaps: Mutex::new(Vec::new()),
            }
        }
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
            amount: U256,
        ) -> Result<ApproveTransaction, DexError> {
            let spender = Address::from_str(SPENDER).unwrap();
            Ok(ApproveTransaction {
                data: Bytes::from(IERC20::approveCall { spender, amount }.abi_encode()).to_string(),
                dex_contract_address: SPENDER.into(),
                gas_limit: "60000".into(),
                gas_price: "1000000000".into(),
            })
        }

        async fn quote(&self, _request: &QuoteRequest) -> Result<RouterResult, DexError> {
            Ok(route())
        }

        async fn swap(&self, request: &SwapRequest) -> Result<SwapInfo, DexError> {
            self.swaps.lock().unwrap().push(request.clone());
            Ok(SwapInfo {
                router_result: route(),
                tx: SwapTransaction {
                    data: "0x0d5f0e3b0000".into(),
                    from: request.user_wallet_address.clone(),
                    gas: "200000".into(),
                    gas_price: "1000000000".into(),
                    max_priority_fee_per_gas: None,
                    to: ROUTER.into(),
                    value: "0".into(),
                    min_receive_amount: None,
                },
            })
        }

        async fn token_balances(
            &self,
            _address: &str,
            _tokens: &[TokenBalanceRequestItem],
            _exclude_risk: bool,
        ) -> Result<Vec<TokenAsset>, DexError> {
            Ok(Vec::new())
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

    fn handler(state: FakeState) -> EvmHandler<Arc<FakeRpc>> {
        let rpc = Arc::new(FakeRpc::with(state));
        EvmHandler::new(
            chain_info(ChainIndex::BASE).unwrap(),
            Arc::new(FakeApi::new()),
            TransactionPipeline::with_config(rpc, fast_config()),
        )
        .unwrap()
        .with_default_signer(SignerKey::from(TEST_KEY))
    }

    fn params(from_token: &str, amount: u64) -> SwapParams {
        SwapParams::new(
            ChainIndex::BASE,
            from_token,
            EVM_NATIVE_TOKEN,
            U256::from(amount),
            Decimal::new(5, 3),
            test_signer().address().to_string(),
        )
    }

    #[tokio::test]
    async fn test_sufficient_allowance_sends_only_the_swap() {
        let handler = handler(FakeState {
            allowance: U256::from(5_000_000u64),
            ..FakeState::default()
        });

        let result = handler
            .execute_swap(&params(USDC, 1_000_000), None)
            .await
            .unwrap();
        assert_eq!(result.route.from_token_amount, "1000000");

        handler
            .execute_swap(&params(USDC, 1_000_000), None)
            .await
            .unwrap();

        let sent = handler.pipeline().rpc().sent();
        assert_eq!(sent.len(), 2, "two swaps and no approval");
        assert!(
            sent.iter()
                .all(|tx| tx.to == Address::from_str(ROUTER).unwrap())
        );
    }

    #[tokio::test]
    async fn test_insufficient_allowance_approves_exact_amount_first() {
        let handler = handler(FakeState {
            allowance: U256::from(10u64),
            ..FakeState::default()
        });
        handler
            .execute_swap(&params(USDC, 1_000_000), None)
            .await
            .unwrap();

        let sent = handler.pipeline().rpc().sent();
        assert_eq!(sent.len(), 2);

        let approval = &sent[0];
        assert_eq!(approval.to, Address::from_str(USDC).unwrap());
        let call = IERC20::approveCall::abi_decode(&approval.data).unwrap();
        assert_eq!(call.spender, Address::from_str(SPENDER).unwrap());
        assert_eq!(call.amount, U256::from(1_000_000u64));
        assert_eq!(
            approval.max_fee_per_gas,
            Some(10_000_000_000 * 12 / 10 + 1_000_000_000)
        );

        let swap = &sent[1];
        assert_eq!(swap.to, Address::from_str(ROUTER).unwrap());
        assert_eq!(swap.gas_limit, Some(300_000), "aggregator gas x 1.5");
        assert_eq!(
            swap.max_fee_per_gas,
            Some(10_000_000_000 * 5 + 1_000_000_000)
        );

        // The confirmed approval raised the allowance; a repeat swap needs none.
        handler
            .execute_swap(&params(USDC, 1_000_000), None)
            .await
            .unwrap();
        assert_eq!(handler.pipeline().rpc().sent().len(), 3);
    }

    #[tokio::test]
    async fn test_native_token_skips_allowance_check() {
        let handler = handler(FakeState::default());
        handler
            .execute_swap(&params(EVM_NATIVE_TOKEN, 1_000), None)
            .await
            .unwrap();
        let rpc = handler.pipeline().rpc();
        assert_eq!(rpc.state.lock().unwrap().allowance_queries, 0);
        assert_eq!(rpc.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_is_wrapped() {
        let handler = handler(FakeState {
            receipt: Some(false),
            ..FakeState::default()
        });
        let err = handler
            .execute_swap(&params(USDC, 1_000_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::InsufficientApproval(_)));
        assert!(err.tx_hash().is_some());
        assert_eq!(handler.pipeline().rpc().sent().len(), 1, "swap never sent");
    }

    #[tokio::test]
    async fn test_missing_signer_is_configuration_error() {
        let rpc = Arc::new(FakeRpc::default());
        let handler = EvmHandler::new(
            chain_info(ChainIndex::BASE).unwrap(),
            Arc::new(FakeApi::new()),
            TransactionPipeline::with_config(rpc, fast_config()),
        )
        .unwrap();
        assert!(matches!(
            handler.execute_swap(&params(USDC, 1), None).await,
            Err(DexError::Configuration(_))
        ));
        assert!(matches!(
            handler
                .execute_swap(&params(USDC, 1), Some(&SignerKey::from("not-a-key")))
                .await,
            Err(DexError::Signer(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_wallet_is_rejected_before_any_send() {
        let handler = handler(FakeState::default());
        let foreign = "0x1111111111111111111111111111111111111111";

        let mut swap = params(USDC, 1_000_000);
        swap.wallet = foreign.into();
        assert!(matches!(
            handler.execute_swap(&swap, None).await,
            Err(DexError::Signer(_))
        ));

        let approve = ApproveParams {
            chain: ChainIndex::BASE,
            token: USDC.into(),
            amount: U256::from(42u64),
            wallet: foreign.into(),
        };
        assert!(matches!(
            handler.approve(&approve, None).await,
            Err(DexError::Signer(_))
        ));

        let rpc = handler.pipeline().rpc();
        assert!(rpc.sent().is_empty());
        assert_eq!(rpc.state.lock().unwrap().allowance_queries, 0);
    }

    #[tokio::test]
    async fn test_wallet_match_ignores_checksum_case() {
        let handler = handler(FakeState {
            allowance: U256::from(5_000_000u64),
            ..FakeState::default()
        });
        let mut swap = params(USDC, 1_000_000);
        swap.wallet = swap.wallet.to_ascii_lowercase();
        handler.execute_swap(&swap, None).await.unwrap();
        assert_eq!(handler.pipeline().rpc().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_standalone_approve_uses_aggregator_payload() {
        let handler = handler(FakeState::default());
        let hash = handler
            .approve(
                &ApproveParams {
                    chain: ChainIndex::BASE,
                    token: USDC.into(),
                    amount: U256::from(42u64),
                    wallet: test_signer().address().to_string(),
                },
                None,
            )
            .await
            .unwrap();
        assert!(hash.starts_with("0x"));

        let sent = &handler.pipeline().rpc().sent()[0];
        assert_eq!(sent.to, Address::from_str(USDC).unwrap());
        assert_eq!(sent.gas_limit, Some(60_000));
        let call = IERC20::approveCall::abi_decode(&sent.data).unwrap();
        assert_eq!(call.amount, U256::from(42u64));
    }

    #[tokio::test]
    async fn test_token_decimals() {
        let handler = handler(FakeState::default());
        assert_eq!(handler.get_token_decimals(EVM_NATIVE_TOKEN).await.unwrap(), 18);
        assert_eq!(handler.get_token_decimals(USDC).await.unwrap(), 6);
    }

    #[test]
    fn test_rejects_non_evm_chain() {
        let result = EvmHandler::new(
            chain_info(ChainIndex::SOLANA).unwrap(),
            Arc::new(FakeApi::new()),
            TransactionPipeline::new(Arc::new(FakeRpc::default())),
        );
        assert!(matches!(result, Err(DexError::Configuration(_))));
    }
}
