#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Multi-chain swap client for the OKX DEX aggregator.
//!
//! [`DexClient`] routes each operation to the handler for the chain's family,
//! converts human-readable amounts to raw units with cached token precision,
//! and sizes swaps from a share of the wallet's balance.
//!
//! # Modules
//!
//! - [`client`] - The [`DexClient`] facade and [`SwapOrder`]
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`factory`] - Per-chain handler construction
//!
//! # Feature Flags
//!
//! - `chain-evm` - EVM execution through `okx-dex-evm`
//! - `chain-solana` - Solana execution through `okx-dex-svm`
//! - `telemetry` - Enables tracing instrumentation and the CLI log subscriber

pub mod client;
pub mod config;
pub mod factory;

pub use client::{DexClient, SwapOrder};
pub use config::{ApiConfig, ChainConfig, ConfigError, DexConfig};
pub use factory::{HandlerFactory, RpcHandlerFactory};
