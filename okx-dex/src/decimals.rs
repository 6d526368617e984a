//! Token precision cache.
//!
//! Precision is immutable on-chain, so a value fetched once is valid for the
//! life of the process. Entries are keyed by `(chain, normalized address)`;
//! two tokens on different chains never share an entry.

use dashmap::DashMap;
use std::future::Future;

use crate::chain::{ChainIndex, ChainInfo};
use crate::error::DexError;

/// Memoizes token decimals per chain.
#[derive(Debug, Default)]
pub struct DecimalsResolver {
    cache: DashMap<(ChainIndex, String), u8>,
}

impl DecimalsResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached precision of `token`, if any.
    #[must_use]
    pub fn cached(&self, info: &ChainInfo, token: &str) -> Option<u8> {
        let key = (info.index, info.normalize_address(token));
        self.cache.get(&key).map(|entry| *entry)
    }

    /// Resolves the precision of `token` on `info`'s chain.
    ///
    /// The native token resolves to the chain's native precision without a
    /// lookup. Otherwise the cache is consulted and `lookup` runs only on a
    /// miss; failed lookups are not cached. Concurrent misses for the same key
    /// may both run `lookup`, which is harmless since the value is the same.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `lookup`.
    pub async fn resolve_with<F, Fut>(
        &self,
        info: &ChainInfo,
        token: &str,
        lookup: F,
    ) -> Result<u8, DexError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u8, DexError>>,
    {
        if info.is_native_token(token) {
            return Ok(info.native_decimals);
        }
        let key = (info.index, info.normalize_address(token));
        if let Some(decimals) = self.cache.get(&key) {
            return Ok(*decimals);
        }

        let decimals = lookup().await?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(chain = %key.0, token = %key.1, decimals, "cached token decimals");
        self.cache.insert(key, decimals);
        Ok(decimals)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::chain_info;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_lookup_runs_once_per_token() {
        let resolver = DecimalsResolver::new();
        let eth = chain_info(ChainIndex::ETHEREUM).unwrap();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let lookup = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(6)
        };

        let usdc = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        assert_eq!(resolver.resolve_with(eth, usdc, lookup).await.unwrap(), 6);
        assert_eq!(
            resolver
                .resolve_with(eth, &usdc.to_lowercase(), lookup)
                .await
                .unwrap(),
            6
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached(eth, usdc), Some(6));
    }

    #[tokio::test]
    async fn test_native_token_skips_lookup() {
        let resolver = DecimalsResolver::new();
        let sol = chain_info(ChainIndex::SOLANA).unwrap();
        let decimals = resolver
            .resolve_with(sol, crate::chain::SOLANA_NATIVE_TOKEN, || async {
                Err(DexError::Rpc("unreachable".into()))
            })
            .await
            .unwrap();
        assert_eq!(decimals, 9);
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_same_address_on_different_chains_is_separate() {
        let resolver = DecimalsResolver::new();
        let token = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";
        let eth = chain_info(ChainIndex::ETHEREUM).unwrap();
        let base = chain_info(ChainIndex::BASE).unwrap();
        resolver.resolve_with(eth, token, || async { Ok(18) }).await.unwrap();
        let on_base = resolver.resolve_with(base, token, || async { Ok(6) }).await.unwrap();
        assert_eq!(on_base, 6);
        assert_eq!(resolver.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let resolver = DecimalsResolver::new();
        let eth = chain_info(ChainIndex::ETHEREUM).unwrap();
        let token = "0x0000000000000000000000000000000000000001";
        let first = resolver
            .resolve_with(eth, token, || async { Err(DexError::Rpc("down".into())) })
            .await;
        assert!(first.is_err());
        assert!(resolver.cached(eth, token).is_none());
    }
}
