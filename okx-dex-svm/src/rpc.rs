//! Chain access for the ledger pipeline.

use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::fmt;
use std::sync::Arc;

/// Errors returned by [`LedgerRpc`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerRpcError {
    /// RPC client error.
    #[error(transparent)]
    Client(Box<ClientError>),
    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

impl From<ClientError> for LedgerRpcError {
    fn from(err: ClientError) -> Self {
        Self::Client(Box::new(err))
    }
}

/// Owner and raw data of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    /// Program that owns the account.
    pub owner: Pubkey,
    /// Account data.
    pub data: Vec<u8>,
}

/// Node operations used by the ledger pipeline.
pub trait LedgerRpc: Send + Sync {
    /// Latest blockhash at `confirmed` commitment.
    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash, LedgerRpcError>> + Send;

    /// Submits a signed transaction with preflight at `confirmed` commitment.
    ///
    /// `max_retries` bounds the node's resubmission of this transaction; it
    /// does not apply to confirmation.
    fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        max_retries: usize,
    ) -> impl Future<Output = Result<Signature, LedgerRpcError>> + Send;

    /// Status of a signature: `None` while unknown, `Some(Err(reason))` if
    /// the transaction failed.
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<Result<(), String>>, LedgerRpcError>> + Send;

    /// Reads an account.
    fn account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<AccountData, LedgerRpcError>> + Send;
}

impl<T: LedgerRpc> LedgerRpc for Arc<T> {
    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash, LedgerRpcError>> + Send {
        (**self).latest_blockhash()
    }

    fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        max_retries: usize,
    ) -> impl Future<Output = Result<Signature, LedgerRpcError>> + Send {
        (**self).send_transaction(tx, max_retries)
    }

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<Result<(), String>>, LedgerRpcError>> + Send {
        (**self).signature_status(signature)
    }

    fn account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<AccountData, LedgerRpcError>> + Send {
        (**self).account(pubkey)
    }
}

/// [`LedgerRpc`] over the nonblocking `solana-client` RPC client.
pub struct SolanaRpc {
    client: RpcClient,
}

impl fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("url", &self.client.url())
            .finish()
    }
}

impl SolanaRpc {
    /// Connects to `rpc_url` with `confirmed` commitment.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        #[cfg(feature = "telemetry")]
        tracing::info!(rpc_url = %rpc_url, "Using Solana RPC");
        Self {
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
        }
    }

    /// Returns the wrapped client.
    #[must_use]
    pub const fn client(&self) -> &RpcClient {
        &self.client
    }
}

impl LedgerRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerRpcError> {
        let (hash, _last_valid_height) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?;
        Ok(hash)
    }

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<Signature, LedgerRpcError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            max_retries: Some(max_retries),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.client.send_transaction_with_config(tx, config).await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, LedgerRpcError> {
        let status = self.client.get_signature_status(signature).await?;
        Ok(status.map(|result| result.map_err(|e| e.to_string())))
    }

    async fn account(&self, pubkey: &Pubkey) -> Result<AccountData, LedgerRpcError> {
        let account = self.client.get_account(pubkey).await?;
        Ok(AccountData {
            owner: account.owner,
            data: account.data,
        })
    }
}
