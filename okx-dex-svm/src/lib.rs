#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana swap execution for the OKX DEX aggregator.
//!
//! [`SolanaHandler`] implements [`okx_dex::handler::ChainHandler`] for
//! slot/blockhash chains. Solana has no spender-approval primitive, so a swap
//! is a single transaction: the aggregator's prebuilt payload is decoded, its
//! recent blockhash is replaced with one fetched at send time, and the
//! fee payer signs.
//!
//! The signed transaction goes either straight to an RPC node
//! ([`ChainHandler::execute_swap`](okx_dex::handler::ChainHandler::execute_swap))
//! or through the aggregator's broadcast relay
//! ([`ChainHandler::broadcast_swap`](okx_dex::handler::ChainHandler::broadcast_swap)),
//! which returns a trackable order id.
//!
//! # Modules
//!
//! - [`handler`] - [`SolanaHandler`] and its settings
//! - [`rpc`] - [`LedgerRpc`] and the `solana-client` adapter
//! - [`transaction`] - Payload decoding, blockhash refresh and signing
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod handler;
pub mod rpc;
pub mod transaction;

pub use handler::{LedgerConfig, SolanaHandler};
pub use rpc::{AccountData, LedgerRpc, LedgerRpcError, SolanaRpc};
