//! EVM swap execution for the OKX DEX aggregator.
//!
//! [`EvmHandler`] implements [`okx_dex::handler::ChainHandler`] for every
//! account/nonce chain in the routing table. A swap of an ERC-20 token first
//! makes sure the aggregator's router holds a sufficient allowance, then
//! sends the aggregator's swap transaction through the
//! [`TransactionPipeline`]: simulate, fill nonce and fees, sign, broadcast
//! and wait for the receipt.
//!
//! Chain access goes through the [`EvmRpc`] trait so the pipeline can run
//! against any node client; [`AlloyRpc`] is the `alloy` implementation.
//!
//! # Modules
//!
//! - [`contract`] - Solidity interface definitions
//! - [`handler`] - [`EvmHandler`]
//! - [`pipeline`] - [`TransactionPipeline`] and fee multipliers
//! - [`rpc`] - [`EvmRpc`], [`TransactionDraft`] and the alloy adapter
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod contract;
pub mod handler;
pub mod pipeline;
pub mod rpc;

pub use handler::EvmHandler;
pub use pipeline::{FeeMultiplier, PipelineConfig, TransactionPipeline};
pub use rpc::{AlloyRpc, EvmRpc, EvmRpcError, TransactionDraft};
