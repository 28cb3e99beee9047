//! Wire types returned by a pTokens bridge node

use std::collections::HashMap;

use ptokens_core::{BlockHeight, Blockchain, ChainPairing, Network};
use serde::{Deserialize, Serialize};

/// Node metadata from `GET /info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node (enclave) public key, hex-encoded compressed secp256k1 point
    pub public_key: String,
    /// pToken contract on the host chain
    #[serde(default)]
    pub smart_contract_address: Option<String>,
    #[serde(default)]
    pub last_processed_native_block: BlockHeight,
    #[serde(default)]
    pub last_processed_host_block: BlockHeight,
    pub native_blockchain: String,
    pub native_network: String,
    pub host_blockchain: String,
    pub host_network: String,
    #[serde(default)]
    pub host_symbol: Option<String>,
    /// Vault holding native funds (ERC-20 style pTokens)
    #[serde(default)]
    pub native_vault_address: Option<String>,
}

impl NodeInfo {
    /// Parse the reported chain identifiers. `None` when any of them is unknown.
    pub fn pairing(&self) -> Option<ChainPairing> {
        Some(ChainPairing {
            native_blockchain: self.native_blockchain.parse::<Blockchain>().ok()?,
            native_network: Network::from_identifier(&self.native_network)?,
            host_blockchain: self.host_blockchain.parse::<Blockchain>().ok()?,
            host_network: Network::from_identifier(&self.host_network)?,
        })
    }

    /// Whether the node serves exactly the given pairing
    pub fn serves(&self, pairing: &ChainPairing) -> bool {
        self.pairing().as_ref() == Some(pairing)
    }

    /// Human-readable pairing as reported, for logs
    pub fn reported_pairing(&self) -> String {
        format!(
            "{}:{} -> {}:{}",
            self.native_blockchain, self.native_network, self.host_blockchain, self.host_network
        )
    }
}

/// Node-published record of one observed cross-chain transfer.
///
/// Untrusted input: used for progress reporting, corroborated against the
/// chains where possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(alias = "originating_tx_hash", default)]
    pub incoming_tx_hash: Option<String>,
    #[serde(default)]
    pub broadcast_tx_hash: Option<String>,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub broadcast_timestamp: Option<serde_json::Value>,
    #[serde(alias = "originating_address", default)]
    pub sender_address: Option<String>,
    #[serde(alias = "destination_address", default)]
    pub recipient_address: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Status of a transaction the node should act on, from
/// `GET /incoming-tx-status/:txId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingTxStatus {
    pub broadcast: bool,
    /// Counterpart transaction broadcast by the node
    #[serde(alias = "eth_tx_hash", alias = "host_tx_hash", alias = "native_tx_hash", default)]
    pub broadcast_tx_hash: Option<String>,
}

/// Deposit address issued by a node for one host address, from
/// `GET /deposit-address/:hostAddress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddressResponse {
    pub nonce: u64,
    pub native_deposit_address: String,
    pub enclave_public_key: String,
}

/// Which side of the bridge a report list covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSide {
    Host,
    Native,
}

impl ReportSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Native => "native",
        }
    }
}

/// Address filters supported by `GET /reports`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFilter {
    Sender(String),
    Recipient(String),
    NativeAddress(String),
    HostAddress(String),
}

impl ReportFilter {
    /// Query parameter (key, value) for this filter
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            Self::Sender(addr) => ("sender", addr),
            Self::Recipient(addr) => ("recipient", addr),
            Self::NativeAddress(addr) => ("native_address", addr),
            Self::HostAddress(addr) => ("host_address", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptokens_core::{Blockchain, Network};

    fn info_json() -> serde_json::Value {
        serde_json::json!({
            "public_key": "0367663eeb293b978b495c20dee62cbfba551bf7e05a8381b374af84861ab6de39",
            "smart_contract_address": "0x5979f50f1d4c08f9a53863c2f39a7b0492c38d0f",
            "last_processed_native_block": 1838800,
            "last_processed_host_block": 8391200,
            "native_network": "testnet",
            "host_network": "ropsten_testnet",
            "native_blockchain": "litecoin",
            "host_blockchain": "ethereum",
            "host_symbol": "ETH"
        })
    }

    #[test]
    fn test_node_info_pairing() {
        let info: NodeInfo = serde_json::from_value(info_json()).unwrap();
        let pairing = info.pairing().unwrap();
        assert_eq!(pairing.native_blockchain, Blockchain::Litecoin);
        assert_eq!(pairing.host_network, Network::Testnet);
        assert!(info.native_vault_address.is_none());
    }

    #[test]
    fn test_node_info_unknown_chain() {
        let mut json = info_json();
        json["native_blockchain"] = "dogecoin".into();
        let info: NodeInfo = serde_json::from_value(json).unwrap();
        assert!(info.pairing().is_none());
    }

    #[test]
    fn test_incoming_status_aliases() {
        let status: IncomingTxStatus =
            serde_json::from_str(r#"{"broadcast": true, "eth_tx_hash": "0xabc"}"#).unwrap();
        assert_eq!(status.broadcast_tx_hash.as_deref(), Some("0xabc"));

        let pending: IncomingTxStatus = serde_json::from_str(r#"{"broadcast": false}"#).unwrap();
        assert!(pending.broadcast_tx_hash.is_none());
    }

    #[test]
    fn test_report_keeps_unknown_fields() {
        let report: Report = serde_json::from_value(serde_json::json!({
            "_id": "pltc-on-eth-1",
            "originating_tx_hash": "0x61b2",
            "broadcast_tx_hash": "0x9864",
            "broadcast": true,
            "destination_address": "0x45bc38cafa61030e95b380d1e734beae64a30d66",
            "host_tx_nonce": 7
        }))
        .unwrap();

        assert_eq!(report.incoming_tx_hash.as_deref(), Some("0x61b2"));
        assert!(report.broadcast);
        assert_eq!(report.extra["host_tx_nonce"], 7);
    }

    #[test]
    fn test_deposit_address_response_camel_case() {
        let response: DepositAddressResponse = serde_json::from_str(
            r#"{"nonce": 1589384522, "nativeDepositAddress": "QZ1q", "enclavePublicKey": "03ab"}"#,
        )
        .unwrap();
        assert_eq!(response.nonce, 1589384522);
        assert_eq!(response.native_deposit_address, "QZ1q");
    }

    #[test]
    fn test_report_filter_params() {
        let filter = ReportFilter::HostAddress("0xdf3b".into());
        assert_eq!(filter.query_param(), ("host_address", "0xdf3b"));
    }
}
