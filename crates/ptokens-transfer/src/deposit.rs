//! Deposit address generation and client-side verification
//!
//! A node-issued deposit address is never trusted as is: the client rebuilds
//! the deposit script from the host address, nonce and node key and only
//! accepts the address if the encodings match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use bridge_node_client::SelectedNode;
use host_chain::{host_address_bytes, validate_host_address};
use native_chain::{derive_deposit_address, NativeParams};
use ptokens_core::{Blockchain, TransferError};

/// A deposit address issued for one host address and nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositAddress {
    host_blockchain: Blockchain,
    host_address: String,
    nonce: u64,
    node_public_key: String,
    params: NativeParams,
    value: String,
}

impl DepositAddress {
    pub fn new(
        host_blockchain: Blockchain,
        host_address: impl Into<String>,
        nonce: u64,
        node_public_key: impl Into<String>,
        params: NativeParams,
        value: impl Into<String>,
    ) -> Self {
        Self {
            host_blockchain,
            host_address: host_address.into(),
            nonce,
            node_public_key: node_public_key.into(),
            params,
            value: value.into(),
        }
    }

    /// Address string as supplied by the node
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn host_address(&self) -> &str {
        &self.host_address
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn node_public_key(&self) -> &str {
        &self.node_public_key
    }

    pub fn params(&self) -> &NativeParams {
        &self.params
    }

    /// The address recomputed from the host address, nonce and node key
    pub fn expected_address(&self) -> Result<String, TransferError> {
        let host_bytes = host_address_bytes(self.host_blockchain, &self.host_address)?;
        derive_deposit_address(&host_bytes, self.nonce, &self.node_public_key, &self.params)
            .map_err(|e| TransferError::NodeReportedFailure {
                message: e.to_string(),
            })
    }

    /// Whether the node-supplied address matches the local derivation
    pub fn verify(&self) -> bool {
        matches!(self.expected_address(), Ok(expected) if expected == self.value)
    }

    /// Like [`verify`](Self::verify), reporting what was expected on mismatch
    pub fn ensure_verified(&self) -> Result<(), TransferError> {
        let expected = self.expected_address()?;
        if expected == self.value {
            Ok(())
        } else {
            Err(TransferError::AddressMismatch {
                expected,
                received: self.value.clone(),
            })
        }
    }
}

impl fmt::Display for DepositAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Last nonce seen per host address within this session
#[derive(Debug, Default)]
pub struct NonceRegistry {
    last: Mutex<HashMap<String, u64>>,
}

impl NonceRegistry {
    /// Record `nonce` for `host_address`; it must exceed every earlier one
    pub fn record(&self, host_address: &str, nonce: u64) -> Result<(), TransferError> {
        let key = host_address.to_ascii_lowercase();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = last.get(&key) {
            if nonce <= *previous {
                return Err(TransferError::NodeReportedFailure {
                    message: format!(
                        "node reused nonce {} for {} (last seen {})",
                        nonce, host_address, previous
                    ),
                });
            }
        }
        last.insert(key, nonce);
        Ok(())
    }
}

/// Requests deposit addresses from the selected node and verifies them
#[derive(Debug)]
pub struct DepositEngine {
    host_blockchain: Blockchain,
    params: NativeParams,
    nonces: NonceRegistry,
}

impl DepositEngine {
    pub fn new(host_blockchain: Blockchain, params: NativeParams) -> Self {
        Self {
            host_blockchain,
            params,
            nonces: NonceRegistry::default(),
        }
    }

    /// Obtain and verify a fresh deposit address for `host_address`
    pub async fn generate(
        &self,
        node: &SelectedNode,
        host_address: &str,
    ) -> Result<DepositAddress, TransferError> {
        validate_host_address(self.host_blockchain, host_address)?;

        let response = node.client.generate_deposit_address(host_address).await?;
        self.nonces.record(host_address, response.nonce)?;

        if !response
            .enclave_public_key
            .eq_ignore_ascii_case(node.public_key())
        {
            tracing::warn!(
                endpoint = %node.endpoint(),
                info_key = %node.public_key(),
                deposit_key = %response.enclave_public_key,
                "Deposit address key differs from advertised node key"
            );
        }

        let deposit = DepositAddress::new(
            self.host_blockchain,
            host_address,
            response.nonce,
            response.enclave_public_key,
            self.params,
            response.native_deposit_address,
        );

        if let Err(e) = deposit.ensure_verified() {
            tracing::error!(
                endpoint = %node.endpoint(),
                host_address = %host_address,
                nonce = deposit.nonce(),
                error = %e,
                "Deposit address verification failed"
            );
            return Err(e);
        }

        tracing::info!(
            address = %deposit,
            host_address = %host_address,
            nonce = deposit.nonce(),
            "Verified deposit address"
        );
        Ok(deposit)
    }
}
