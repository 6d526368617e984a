//! In-memory signing key material.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// A private key held in process memory for the duration of a call chain.
///
/// The encoding is family specific: hex (with or without `0x`) for EVM
/// chains, base58 keypair bytes for Solana. Chain handlers parse it when
/// they need to sign. The key is never logged: `Debug` is redacted and there
/// is no `Display` or `Serialize` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerKey(String);

impl SignerKey {
    /// Wraps a private key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key string.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignerKey(***)")
    }
}

impl From<&str> for SignerKey {
    fn from(value: &str) -> Self {
        Self::new(value.trim())
    }
}

impl From<String> for SignerKey {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl<'de> Deserialize<'de> for SignerKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = SignerKey::from("0x4c0883a69102937d6231471b5dbb6204fe512961708279f0d1d1f1f1f1f1f1f1");
        assert_eq!(format!("{key:?}"), "SignerKey(***)");
        assert!(key.expose().starts_with("0x4c08"));
    }

    #[test]
    fn test_trims_whitespace() {
        let key: SignerKey = serde_json::from_str("\" abc \"").unwrap();
        assert_eq!(key.expose(), "abc");
    }
}
