//! Chain identifiers and the static routing table.
//!
//! The aggregator identifies chains by a numeric "chain index" (`1` for
//! Ethereum, `501` for Solana, ...). Every index the SDK knows about is listed
//! in a static table that maps it to a [`ChainFamily`]; dispatch is resolved
//! once from that table rather than by matching strings at call sites.
//!
//! - [`ChainIndex`] - The aggregator's chain identifier
//! - [`ChainFamily`] - Closed set of execution backends
//! - [`ChainInfo`] - One row of the routing table
//! - [`known_chains`] / [`chain_info`] - Table lookups

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// The aggregator's numeric chain index.
///
/// # Serialization
///
/// Serializes to a decimal string (`"501"`). Deserializes from either a string
/// or a JSON integer, since the aggregator uses both forms across endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainIndex(u64);

impl ChainIndex {
    /// Ethereum mainnet.
    pub const ETHEREUM: Self = Self(1);
    /// OKT Chain.
    pub const OKTC: Self = Self(66);
    /// BNB Smart Chain.
    pub const BSC: Self = Self(56);
    /// Polygon `PoS`.
    pub const POLYGON: Self = Self(137);
    /// Fantom Opera.
    pub const FANTOM: Self = Self(250);
    /// Avalanche C-Chain.
    pub const AVALANCHE: Self = Self(43114);
    /// Arbitrum One.
    pub const ARBITRUM: Self = Self(42161);
    /// Optimism.
    pub const OPTIMISM: Self = Self(10);
    /// Base.
    pub const BASE: Self = Self(8453);
    /// Solana mainnet.
    pub const SOLANA: Self = Self(501);
    /// Sui mainnet.
    pub const SUI: Self = Self(784);
    /// Tron mainnet.
    pub const TRON: Self = Self(195);
    /// TON mainnet.
    pub const TON: Self = Self(607);

    /// Creates a chain index from its numeric value.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the numeric value of the index.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the routing-table entry for this index, if the chain is known.
    #[must_use]
    pub fn info(self) -> Option<&'static ChainInfo> {
        chain_info(self)
    }
}

impl fmt::Display for ChainIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when parsing a chain index that is not a decimal integer.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain index {0}")]
pub struct ChainIndexFormatError(String);

impl FromStr for ChainIndex {
    type Err = ChainIndexFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ChainIndexFormatError(s.into()))
    }
}

impl Serialize for ChainIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChainIndexVisitor;

        impl de::Visitor<'_> for ChainIndexVisitor {
            type Value = ChainIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a chain index as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ChainIndex(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(ChainIndex)
                    .map_err(|_| E::custom("chain index must be non-negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ChainIndex::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ChainIndexVisitor)
    }
}

/// The execution backend a chain is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// Account/nonce chains with ERC-20 allowances and EIP-1559 fees.
    Evm,
    /// Slot/blockhash chains (Solana).
    Ledger,
    /// Known to the aggregator but without a working execution backend.
    Unsupported,
}

impl ChainFamily {
    /// Returns `true` if token addresses of this family compare case-insensitively.
    #[must_use]
    pub const fn has_case_insensitive_addresses(self) -> bool {
        matches!(self, Self::Evm)
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
            Self::Ledger => f.write_str("ledger"),
            Self::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// One row of the static routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    /// Aggregator chain index.
    pub index: ChainIndex,
    /// Human-readable chain name.
    pub name: &'static str,
    /// Execution backend.
    pub family: ChainFamily,
    /// Placeholder address the aggregator uses for the chain's native token.
    pub native_token: &'static str,
    /// Precision of the native token.
    pub native_decimals: u8,
}

impl ChainInfo {
    /// Returns `true` if `token` is this chain's native-token placeholder.
    #[must_use]
    pub fn is_native_token(&self, token: &str) -> bool {
        let token = token.trim();
        if self.family.has_case_insensitive_addresses() {
            token.eq_ignore_ascii_case(self.native_token)
        } else {
            token == self.native_token
        }
    }

    /// Normalizes a token address for use as a cache key on this chain.
    ///
    /// EVM addresses are lower-cased; base58 and other encodings are
    /// case-sensitive and returned unchanged.
    #[must_use]
    pub fn normalize_address(&self, token: &str) -> String {
        if self.family.has_case_insensitive_addresses() {
            token.trim().to_ascii_lowercase()
        } else {
            token.trim().to_owned()
        }
    }
}

/// Native-token placeholder used by the aggregator on every EVM chain.
pub const EVM_NATIVE_TOKEN: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// Native SOL placeholder (the system program address).
pub const SOLANA_NATIVE_TOKEN: &str = "11111111111111111111111111111111";

const fn evm(index: ChainIndex, name: &'static str) -> ChainInfo {
    ChainInfo {
        index,
        name,
        family: ChainFamily::Evm,
        native_token: EVM_NATIVE_TOKEN,
        native_decimals: 18,
    }
}

static KNOWN_CHAINS: [ChainInfo; 13] = [
    evm(ChainIndex::ETHEREUM, "Ethereum"),
    evm(ChainIndex::OKTC, "OKTC"),
    evm(ChainIndex::BSC, "BNB Smart Chain"),
    evm(ChainIndex::POLYGON, "Polygon"),
    evm(ChainIndex::FANTOM, "Fantom"),
    evm(ChainIndex::AVALANCHE, "Avalanche C-Chain"),
    evm(ChainIndex::ARBITRUM, "Arbitrum One"),
    evm(ChainIndex::OPTIMISM, "Optimism"),
    evm(ChainIndex::BASE, "Base"),
    ChainInfo {
        index: ChainIndex::SOLANA,
        name: "Solana",
        family: ChainFamily::Ledger,
        native_token: SOLANA_NATIVE_TOKEN,
        native_decimals: 9,
    },
    ChainInfo {
        index: ChainIndex::SUI,
        name: "Sui",
        family: ChainFamily::Unsupported,
        native_token: "0x2::sui::SUI",
        native_decimals: 9,
    },
    ChainInfo {
        index: ChainIndex::TRON,
        name: "Tron",
        family: ChainFamily::Unsupported,
        native_token: "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb",
        native_decimals: 6,
    },
    ChainInfo {
        index: ChainIndex::TON,
        name: "TON",
        family: ChainFamily::Unsupported,
        native_token: "EQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAM9c",
        native_decimals: 9,
    },
];

/// Returns every chain in the routing table.
#[must_use]
pub fn known_chains() -> &'static [ChainInfo] {
    &KNOWN_CHAINS
}

/// Looks up a chain in the routing table.
#[must_use]
pub fn chain_info(index: ChainIndex) -> Option<&'static ChainInfo> {
    KNOWN_CHAINS.iter().find(|info| info.index == index)
}
