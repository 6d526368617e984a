//! Signed REST client for the OKX DEX aggregator.
//!
//! [`OkxApiClient`] implements [`okx_dex::api::DexApi`] on top of `reqwest`.
//! Every request is authenticated with the aggregator's HMAC-SHA256 scheme
//! (see [`auth`]) and every response is unwrapped from the `{code, msg, data}`
//! envelope (see [`envelope`]).
//!
//! # Modules
//!
//! - [`auth`] - Credentials and request signing
//! - [`client`] - The [`OkxApiClient`] and its endpoint methods
//! - [`constants`] - Endpoint paths and header names
//! - [`envelope`] - Response envelope decoding
//! - [`error`] - [`ApiClientError`]
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits tracing spans and events for each request

pub mod auth;
pub mod client;
pub mod constants;
pub mod envelope;
pub mod error;

pub use auth::Credentials;
pub use client::OkxApiClient;
pub use error::ApiClientError;
