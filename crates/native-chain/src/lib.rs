//! native-chain: Bitcoin and Litecoin support for pTokens
//!
//! Deposit script derivation, address validation (with legacy P2SH
//! remapping) and read access to an Esplora explorer.

pub mod address;
pub mod esplora;
pub mod params;
pub mod script;

pub use address::{remap_legacy_p2sh, validate_address, AddressError, NativeAddressKind};
pub use esplora::{EsploraClient, MempoolTx, NativeExplorer, TxStatus, Utxo};
pub use params::{NativeParams, NATIVE_DECIMALS};
pub use script::{
    deposit_commitment, deposit_script, derive_deposit_address, hash256, p2sh_address,
    ScriptError,
};
