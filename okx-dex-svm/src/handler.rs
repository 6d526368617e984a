//! [`ChainHandler`] for slot/blockhash chains.

use okx_dex::DexError;
use okx_dex::api::DexApi;
use okx_dex::chain::{ChainFamily, ChainInfo};
use okx_dex::handler::{ApproveParams, ChainHandler, SwapParams};
use okx_dex::proto::{BroadcastRequest, SwapInfo, SwapResult};
use okx_dex::signer::SignerKey;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;
use spl_token_2022::extension::StateWithExtensions;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::rpc::LedgerRpc;
use crate::transaction::{decode_transaction, encode_transaction, refresh_and_sign};

/// Submission and confirmation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Node-side resubmission cap for a sent transaction.
    pub max_retries: usize,
    /// Upper bound on the wait for confirmation.
    pub confirm_timeout: Duration,
    /// Delay between signature status polls.
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Executes aggregator swaps on Solana.
pub struct SolanaHandler<R> {
    chain: &'static ChainInfo,
    api: Arc<dyn DexApi>,
    rpc: R,
    config: LedgerConfig,
    default_signer: Option<SignerKey>,
}

impl<R> fmt::Debug for SolanaHandler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaHandler")
            .field("chain", &self.chain.name)
            .field("config", &self.config)
            .field("default_signer", &self.default_signer)
            .finish_non_exhaustive()
    }
}

impl<R: LedgerRpc> SolanaHandler<R> {
    /// Creates a handler for `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::Configuration`] if `chain` is not a ledger chain.
    pub fn new(chain: &'static ChainInfo, api: Arc<dyn DexApi>, rpc: R) -> Result<Self, DexError> {
        if chain.family != ChainFamily::Ledger {
            return Err(DexError::Configuration(format!(
                "{} is not a ledger chain",
                chain.name
            )));
        }
        Ok(Self {
            chain,
            api,
            rpc,
            config: LedgerConfig::default(),
            default_signer: None,
        })
    }

    /// Overrides the submission and confirmation settings.
    #[must_use]
    pub const fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the key used when a call does not supply one.
    #[must_use]
    pub fn with_default_signer(mut self, signer: SignerKey) -> Self {
        self.default_signer = Some(signer);
        self
    }

    /// Returns the RPC.
    pub const fn rpc(&self) -> &R {
        &self.rpc
    }

    fn resolve_signer(&self, signer: Option<&SignerKey>) -> Result<Keypair, DexError> {
        let key = signer.or(self.default_signer.as_ref()).ok_or_else(|| {
            DexError::Configuration(format!("no signer configured for {}", self.chain.name))
        })?;
        let bytes = bs58::decode(key.expose())
            .into_vec()
            .map_err(|e| DexError::Signer(format!("keypair is not base58: {e}")))?;
        Keypair::try_from(bytes.as_slice()).map_err(|e| DexError::Signer(e.to_string()))
    }

    /// Fetches the swap payload and signs it against a fresh blockhash.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        chain = %self.chain.index,
        amount = %params.amount
    )))]
    async fn prepare(
        &self,
        params: &SwapParams,
        signer: &Keypair,
    ) -> Result<(SwapInfo, VersionedTransaction), DexError> {
        let swap = self.api.swap(&params.to_request()).await?;
        let tx = decode_transaction(&swap.tx.data)?;
        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|e| DexError::Rpc(e.to_string()))?;
        let signed = refresh_and_sign(tx, blockhash, signer)?;

        #[cfg(feature = "telemetry")]
        tracing::debug!(%blockhash, "Swap signed against fresh blockhash");
        Ok((swap, signed))
    }

    /// Polls the signature status until it is final or the bound elapses.
    #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
    async fn await_confirmation(&self, signature: &Signature) -> Result<(), DexError> {
        let poll = async {
            loop {
                match self.rpc.signature_status(signature).await {
                    Ok(Some(Ok(()))) => return Ok(()),
                    Ok(Some(Err(reason))) => {
                        return Err(DexError::TransactionFailed {
                            tx_hash: signature.to_string(),
                            reason: Some(reason),
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        #[cfg(feature = "telemetry")]
                        tracing::warn!(%signature, error = %err, "Signature status poll failed");
                    }
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        tokio::time::timeout(self.config.confirm_timeout, poll)
            .await
            .unwrap_or_else(|_| {
                Err(DexError::ConfirmationTimeout {
                    tx_hash: Some(signature.to_string()),
                })
            })
    }
}

#[async_trait::async_trait]
impl<R: LedgerRpc + 'static> ChainHandler for SolanaHandler<R> {
    fn chain(&self) -> &'static ChainInfo {
        self.chain
    }

    async fn execute_swap(
        &self,
        params: &SwapParams,
        signer: Option<&SignerKey>,
    ) -> Result<SwapResult, DexError> {
        let keypair = self.resolve_signer(signer)?;
        let (swap, tx) = self.prepare(params, &keypair).await?;

        let signature = self
            .rpc
            .send_transaction(&tx, self.config.max_retries)
            .await
            .map_err(|e| DexError::BroadcastFailure(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %self.chain.index, %signature, "Swap sent");

        if params.await_confirmation {
            self.await_confirmation(&signature).await?;
            #[cfg(feature = "telemetry")]
            tracing::info!(%signature, "Swap confirmed");
        }

        Ok(SwapResult {
            tx_hash: signature.to_string(),
            route: swap.router_result,
        })
    }

    async fn broadcast_swap(
        &self,
        params: &SwapParams,
        signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        let keypair = self.resolve_signer(signer)?;
        let (_swap, tx) = self.prepare(params, &keypair).await?;

        let request = BroadcastRequest {
            signed_tx: encode_transaction(&tx)?,
            chain_index: self.chain.index,
            address: Some(params.wallet.clone()),
            account_id: None,
        };
        let order_id = self.api.broadcast_transaction(&request).await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %self.chain.index, order_id = %order_id, "Swap relayed");
        Ok(order_id)
    }

    async fn approve(
        &self,
        _params: &ApproveParams,
        _signer: Option<&SignerKey>,
    ) -> Result<String, DexError> {
        Err(DexError::not_supported("approve", self.chain.index))
    }

    async fn get_token_decimals(&self, token: &str) -> Result<u8, DexError> {
        if self.chain.is_native_token(token) {
            return Ok(self.chain.native_decimals);
        }
        let mint = Pubkey::from_str(token.trim())
            .map_err(|e| DexError::Configuration(format!("invalid mint {token:?}: {e}")))?;
        let account = self
            .rpc
            .account(&mint)
            .await
            .map_err(|e| DexError::Rpc(e.to_string()))?;

        if account.owner == spl_token::id() {
            spl_token::state::Mint::unpack(&account.data)
                .map(|m| m.decimals)
                .map_err(|e| DexError::Rpc(format!("failed to unpack mint {mint}: {e}")))
        } else if account.owner == spl_token_2022::id() {
            StateWithExtensions::<spl_token_2022::state::Mint>::unpack(&account.data)
                .map(|m| m.base.decimals)
                .map_err(|e| DexError::Rpc(format!("failed to unpack mint {mint}: {e}")))
        } else {
            Err(DexError::Rpc(format!(
                "{mint} is not owned by a token program"
            )))
        }
    }
}
