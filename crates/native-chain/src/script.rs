//! Deposit script construction and P2SH encoding
//!
//! A deposit address commits to the recipient on the host chain and a nonce,
//! while only the node key can spend from it:
//!
//! ```text
//! <hash256(host_address_bytes || nonce_le64)> OP_DROP <node_pubkey> OP_CHECKSIG
//! ```
//!
//! The script is wrapped as P2SH and base58check-encoded with the network's
//! P2SH version byte.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DROP};
use bitcoin::script::{Builder, PushBytesBuf, ScriptBuf};
use thiserror::Error;

use crate::params::NativeParams;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("Invalid node public key: {0}")]
    InvalidPublicKey(String),

    #[error("Script push too large: {0}")]
    PushTooLarge(String),
}

/// Double SHA-256
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// Commitment to the host recipient and nonce embedded in the deposit script
pub fn deposit_commitment(host_address_bytes: &[u8], nonce: u64) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(host_address_bytes.len() + 8);
    preimage.extend_from_slice(host_address_bytes);
    preimage.extend_from_slice(&nonce.to_le_bytes());
    hash256(&preimage)
}

/// Build the deposit redeem script
pub fn deposit_script(
    host_address_bytes: &[u8],
    nonce: u64,
    node_public_key_hex: &str,
) -> Result<ScriptBuf, ScriptError> {
    let public_key = decode_public_key(node_public_key_hex)?;
    let commitment = deposit_commitment(host_address_bytes, nonce);

    let commitment_push = PushBytesBuf::try_from(commitment.to_vec())
        .map_err(|e| ScriptError::PushTooLarge(e.to_string()))?;
    let key_push =
        PushBytesBuf::try_from(public_key).map_err(|e| ScriptError::PushTooLarge(e.to_string()))?;

    Ok(Builder::new()
        .push_slice(commitment_push)
        .push_opcode(OP_DROP)
        .push_slice(key_push)
        .push_opcode(OP_CHECKSIG)
        .into_script())
}

/// Base58check P2SH address of `script` for the given network
pub fn p2sh_address(script: &ScriptBuf, params: &NativeParams) -> String {
    let script_hash = script.script_hash();
    let mut payload = Vec::with_capacity(21);
    payload.push(params.p2sh_version);
    payload.extend_from_slice(&script_hash.to_byte_array());
    bitcoin::base58::encode_check(&payload)
}

/// Recompute the deposit address a node should have issued
pub fn derive_deposit_address(
    host_address_bytes: &[u8],
    nonce: u64,
    node_public_key_hex: &str,
    params: &NativeParams,
) -> Result<String, ScriptError> {
    let script = deposit_script(host_address_bytes, nonce, node_public_key_hex)?;
    Ok(p2sh_address(&script, params))
}

fn decode_public_key(hex_key: &str) -> Result<Vec<u8>, ScriptError> {
    let bytes = hex::decode(hex_key.trim_start_matches("0x"))
        .map_err(|e| ScriptError::InvalidPublicKey(format!("{}: {}", hex_key, e)))?;

    match (bytes.len(), bytes.first()) {
        (33, Some(0x02 | 0x03)) | (65, Some(0x04)) => Ok(bytes),
        (len, _) => Err(ScriptError::InvalidPublicKey(format!(
            "{} ({} bytes, expected a 33 or 65 byte secp256k1 point)",
            hex_key, len
        ))),
    }
}
