//! Aggregator payload handling.
//!
//! The swap endpoint returns a base58, bincode-encoded
//! [`VersionedTransaction`]. Its blockhash was fetched when the quote was
//! built and may be stale by signing time, so it is always replaced.

use okx_dex::DexError;
use solana_message::Hash;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;

/// Decodes a base58 transaction payload.
///
/// # Errors
///
/// Returns [`DexError::ExternalApi`] if the payload is not base58 or does not
/// deserialize as a versioned transaction.
pub fn decode_transaction(data: &str) -> Result<VersionedTransaction, DexError> {
    let bytes = bs58::decode(data.trim())
        .into_vec()
        .map_err(|e| DexError::external(format!("transaction payload is not base58: {e}")))?;
    bincode::deserialize::<VersionedTransaction>(bytes.as_slice())
        .map_err(|e| DexError::external(format!("malformed transaction payload: {e}")))
}

/// Encodes a signed transaction as base58 for the broadcast endpoint.
///
/// # Errors
///
/// Returns [`DexError::Signer`] if serialization fails.
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, DexError> {
    let bytes = bincode::serialize(tx).map_err(|e| DexError::Signer(e.to_string()))?;
    Ok(bs58::encode(bytes).into_string())
}

/// Replaces the recent blockhash and signs as `signer`.
///
/// Account keys, instructions and address lookup tables are kept as they
/// are. Existing signatures are discarded since they cover the old
/// blockhash.
///
/// # Errors
///
/// Returns [`DexError::ExternalApi`] if the header claims more signers than
/// the message has keys, and [`DexError::Signer`] if `signer` is not a
/// required signer, if signing fails, or if other required signatures would
/// be missing.
pub fn refresh_and_sign<S: Signer + ?Sized>(
    mut tx: VersionedTransaction,
    blockhash: Hash,
    signer: &S,
) -> Result<VersionedTransaction, DexError> {
    tx.message.set_recent_blockhash(blockhash);

    let num_required = usize::from(tx.message.header().num_required_signatures);
    let signer_key = signer.pubkey();
    let position = tx
        .message
        .static_account_keys()
        .get(..num_required)
        .ok_or_else(|| {
            DexError::external(format!(
                "malformed transaction header: {num_required} signers for {} keys",
                tx.message.static_account_keys().len()
            ))
        })?
        .iter()
        .position(|key| *key == signer_key)
        .ok_or_else(|| {
            DexError::Signer(format!("{signer_key} is not a required signer of the swap"))
        })?;

    let signature = signer
        .try_sign_message(tx.message.serialize().as_slice())
        .map_err(|e| DexError::Signer(e.to_string()))?;
    tx.signatures = vec![Signature::default(); num_required];
    tx.signatures[position] = signature;

    if tx.signatures.iter().any(|s| *s == Signature::default()) {
        return Err(DexError::Signer(format!(
            "swap requires {num_required} signatures; only the fee payer can sign"
        )));
    }
    Ok(tx)
}
