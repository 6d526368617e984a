#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for executing OKX DEX aggregator swaps across chain families.
//!
//! This crate is chain-agnostic. It defines the vocabulary shared by the
//! aggregator client (`okx-dex-http`), the per-family execution pipelines
//! (`okx-dex-evm`, `okx-dex-svm`) and the dispatching facade
//! (`okx-dex-client`).
//!
//! # Overview
//!
//! A swap starts with a human-readable amount ("0.5 USDC"). The amount is
//! normalized into the token's raw integer unit using its precision, the
//! aggregator is asked for a route and a prebuilt transaction payload, and a
//! [`handler::ChainHandler`] for the chain's family turns that payload into a
//! confirmed on-chain transaction.
//!
//! # Modules
//!
//! - [`amount`] - Exact human/raw amount conversion and balance-percent sizing
//! - [`api`] - The [`api::DexApi`] trait implemented by aggregator clients
//! - [`chain`] - Chain indices, chain families and the static routing table
//! - [`decimals`] - Per-(chain, token) precision cache
//! - [`error`] - The [`error::DexError`] taxonomy
//! - [`handler`] - The [`handler::ChainHandler`] capability interface
//! - [`proto`] - Aggregator wire types and derived route values
//! - [`signer`] - In-memory signing key material
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod api;
pub mod chain;
pub mod decimals;
pub mod error;
pub mod handler;
pub mod proto;
pub mod signer;

pub use error::DexError;
