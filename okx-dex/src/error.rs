//! Error taxonomy shared by every crate in the workspace.
//!
//! Crate-local errors (HTTP transport, RPC transport, configuration parsing)
//! convert into [`DexError`] at the boundary of their crate, so callers of the
//! facade only ever match on this enum.

use crate::amount::AmountError;
use crate::chain::ChainIndex;

/// Errors surfaced by swap, approval and lookup operations.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    /// A required RPC endpoint, signer or setting is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The chain index is not in the routing table.
    #[error("Unsupported chain {0}")]
    UnsupportedChain(ChainIndex),

    /// The operation is not implemented for the chain's family.
    #[error("{operation} is not supported on chain {chain}")]
    NotSupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Chain the operation was attempted on.
        chain: ChainIndex,
    },

    /// A human amount or percentage could not be converted.
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    /// Granting the allowance required by a swap failed.
    #[error("Token approval failed: {0}")]
    InsufficientApproval(#[source] Box<Self>),

    /// Pre-flight simulation reverted or errored; nothing was broadcast.
    #[error("Simulation failed: {0}")]
    SimulationFailure(String),

    /// The node rejected the signed transaction.
    #[error("Broadcast failed: {0}")]
    BroadcastFailure(String),

    /// No confirmation arrived within the bounded wait.
    #[error("Timed out waiting for confirmation{}", fmt_hash(.tx_hash.as_deref()))]
    ConfirmationTimeout {
        /// Hash or signature of the sent transaction, when one was obtained.
        tx_hash: Option<String>,
    },

    /// The transaction was included but reported failure.
    #[error("Transaction {tx_hash} failed{}", fmt_reason(.reason.as_deref()))]
    TransactionFailed {
        /// Hash or signature of the failed transaction.
        tx_hash: String,
        /// Failure reason reported by the chain, if any.
        reason: Option<String>,
    },

    /// The aggregator returned a non-success code or an unusable payload.
    #[error("Aggregator error{}: {message}", fmt_code(.code.as_deref()))]
    ExternalApi {
        /// Aggregator error code, if the failure came with one.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// A chain read (nonce, fees, allowance, decimals, blockhash) failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A signing key could not be parsed or used.
    #[error("Signer error: {0}")]
    Signer(String),
}

impl DexError {
    /// Creates an [`DexError::ExternalApi`] without an aggregator code.
    #[must_use]
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalApi {
            code: None,
            message: message.into(),
        }
    }

    /// Creates a [`DexError::NotSupported`] for `operation` on `chain`.
    #[must_use]
    pub const fn not_supported(operation: &'static str, chain: ChainIndex) -> Self {
        Self::NotSupported { operation, chain }
    }

    /// Returns the transaction hash attached to this error, if any.
    ///
    /// Callers use it to reconcile timeouts and failures out of band.
    #[must_use]
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::ConfirmationTimeout { tx_hash } => tx_hash.as_deref(),
            Self::TransactionFailed { tx_hash, .. } => Some(tx_hash),
            Self::InsufficientApproval(inner) => inner.tx_hash(),
            _ => None,
        }
    }
}

fn fmt_hash(hash: Option<&str>) -> String {
    hash.map(|h| format!(" for {h}")).unwrap_or_default()
}

fn fmt_reason(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {r}")).unwrap_or_default()
}

fn fmt_code(code: Option<&str>) -> String {
    code.map(|c| format!(" {c}")).unwrap_or_default()
}
