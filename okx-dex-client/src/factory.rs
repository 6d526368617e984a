//! Construction of chain handlers.
//!
//! [`DexClient`](crate::DexClient) builds one handler per chain on first use
//! through a [`HandlerFactory`]. [`RpcHandlerFactory`] is the production
//! factory: it wires each family's pipeline to the RPC endpoint configured
//! for the chain.

use okx_dex::DexError;
use okx_dex::api::DexApi;
use okx_dex::chain::{ChainFamily, ChainIndex, ChainInfo};
use okx_dex::handler::{ChainHandler, UnimplementedHandler};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ChainConfig;

/// Builds the handler for a chain from the routing table.
pub trait HandlerFactory: Send + Sync {
    /// Builds the handler for `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`DexError::Configuration`] if the chain needs settings that
    /// are missing or invalid.
    fn build(
        &self,
        chain: &'static ChainInfo,
        api: Arc<dyn DexApi>,
    ) -> Result<Arc<dyn ChainHandler>, DexError>;
}

/// Builds handlers from per-chain RPC settings.
#[derive(Debug, Clone, Default)]
pub struct RpcHandlerFactory {
    chains: HashMap<ChainIndex, ChainConfig>,
}

impl RpcHandlerFactory {
    /// Creates a factory over the given per-chain settings.
    #[must_use]
    pub const fn new(chains: HashMap<ChainIndex, ChainConfig>) -> Self {
        Self { chains }
    }

    fn settings(&self, chain: &ChainInfo) -> Result<&ChainConfig, DexError> {
        self.chains.get(&chain.index).ok_or_else(|| {
            DexError::Configuration(format!(
                "chain {} ({}) is not configured",
                chain.index, chain.name
            ))
        })
    }
}

impl HandlerFactory for RpcHandlerFactory {
    fn build(
        &self,
        chain: &'static ChainInfo,
        api: Arc<dyn DexApi>,
    ) -> Result<Arc<dyn ChainHandler>, DexError> {
        match chain.family {
            ChainFamily::Evm => build_evm(chain, api, self.settings(chain)?),
            ChainFamily::Ledger => build_ledger(chain, api, self.settings(chain)?),
            ChainFamily::Unsupported => Ok(Arc::new(UnimplementedHandler::new(chain))),
        }
    }
}

#[cfg(feature = "chain-evm")]
fn build_evm(
    chain: &'static ChainInfo,
    api: Arc<dyn DexApi>,
    settings: &ChainConfig,
) -> Result<Arc<dyn ChainHandler>, DexError> {
    use okx_dex_evm::{AlloyRpc, EvmHandler, PipelineConfig, TransactionPipeline};

    let url = url::Url::parse(&settings.rpc_url).map_err(|e| {
        DexError::Configuration(format!("invalid RPC URL for {}: {e}", chain.name))
    })?;
    let pipeline = TransactionPipeline::with_config(
        AlloyRpc::connect_http(url),
        PipelineConfig {
            receipt_timeout: settings.receipt_timeout(),
            ..PipelineConfig::default()
        },
    );
    let mut handler = EvmHandler::new(chain, api, pipeline)?;
    if let Some(signer) = settings.signer() {
        handler = handler.with_default_signer(signer);
    }
    Ok(Arc::new(handler))
}

#[cfg(not(feature = "chain-evm"))]
fn build_evm(
    chain: &'static ChainInfo,
    _api: Arc<dyn DexApi>,
    _settings: &ChainConfig,
) -> Result<Arc<dyn ChainHandler>, DexError> {
    Err(DexError::Configuration(format!(
        "{} requires the chain-evm feature",
        chain.name
    )))
}

#[cfg(feature = "chain-solana")]
fn build_ledger(
    chain: &'static ChainInfo,
    api: Arc<dyn DexApi>,
    settings: &ChainConfig,
) -> Result<Arc<dyn ChainHandler>, DexError> {
    use okx_dex_svm::{LedgerConfig, SolanaHandler, SolanaRpc};

    let config = LedgerConfig {
        max_retries: settings.max_retries,
        confirm_timeout: settings.confirm_timeout(),
        ..LedgerConfig::default()
    };
    let mut handler =
        SolanaHandler::new(chain, api, SolanaRpc::new(settings.rpc_url.clone()))?.with_config(config);
    if let Some(signer) = settings.signer() {
        handler = handler.with_default_signer(signer);
    }
    Ok(Arc::new(handler))
}

#[cfg(not(feature = "chain-solana"))]
fn build_ledger(
    chain: &'static ChainInfo,
    _api: Arc<dyn DexApi>,
    _settings: &ChainConfig,
) -> Result<Arc<dyn ChainHandler>, DexError> {
    Err(DexError::Configuration(format!(
        "{} requires the chain-solana feature",
        chain.name
    )))
}
