//! host-chain: the chain pTokens are minted on
//!
//! The transfer engine only needs two things from a host chain: submitting a
//! redeem (burn) and reading transaction receipts. Key management stays with
//! the implementation behind `HostChain`.

pub mod abi;
pub mod address;
pub mod eos;
pub mod eth;

use std::time::Duration;

use async_trait::async_trait;
use ptokens_core::{Blockchain, ChainError, TxId};
use serde::{Deserialize, Serialize};

pub use abi::{encode_redeem, encode_redeem_hex};
pub use address::{host_address_bytes, host_decimals, validate_host_address};
pub use eos::EosRpcClient;
pub use eth::EthRpcClient;

/// Caller-tunable redeem settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemOptions {
    /// Gas limit for the burn transaction (Ethereum)
    #[serde(default)]
    pub gas: Option<u64>,
    /// Gas price in wei
    #[serde(default)]
    pub gas_price: Option<u128>,
    /// Upper bound on the whole redeem, from submission to native payout
    #[serde(skip)]
    pub max_wait: Option<Duration>,
}

/// A burn of `amount` (host units) paying out to `destination` on the native chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemCall {
    pub contract: String,
    pub amount: u128,
    pub destination: String,
    pub options: RedeemOptions,
}

/// Mined host transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReceipt {
    pub tx_hash: TxId,
    pub success: bool,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait HostChain: Send + Sync {
    fn blockchain(&self) -> Blockchain;

    /// Broadcast the redeem transaction and return its hash
    async fn submit_redeem(&self, call: &RedeemCall) -> Result<TxId, ChainError>;

    /// Receipt of a mined transaction, `None` while pending or unknown
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<HostReceipt>, ChainError>;
}
