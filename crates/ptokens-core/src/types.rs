//! Core type definitions for the pTokens client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction ID on any of the chains involved (hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Parse a network identifier as reported by a bridge node.
    ///
    /// Nodes report either the bare network (`"mainnet"`, `"testnet"`) or a
    /// chain-qualified one (`"ropsten_testnet"`, `"jungle3_testnet"`).
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let id = identifier.trim().to_ascii_lowercase();
        if id == "mainnet" || id.ends_with("_mainnet") || id == "bitcoin" || id == "litecoin" {
            Some(Self::Mainnet)
        } else if id.contains("testnet") {
            Some(Self::Testnet)
        } else {
            None
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Blockchains a pToken can live on, natively or as host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    Bitcoin,
    Litecoin,
    Ethereum,
    Eosio,
}

impl Blockchain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Litecoin => "litecoin",
            Self::Ethereum => "ethereum",
            Self::Eosio => "eosio",
        }
    }

    /// Short ticker-style name used by nodes and in event names
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Bitcoin => "btc",
            Self::Litecoin => "ltc",
            Self::Ethereum => "eth",
            Self::Eosio => "eos",
        }
    }

    /// Whether this chain can hold native funds for a pToken
    pub fn is_utxo(&self) -> bool {
        matches!(self, Self::Bitcoin | Self::Litecoin)
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Blockchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Self::Bitcoin),
            "litecoin" | "ltc" => Ok(Self::Litecoin),
            "ethereum" | "eth" => Ok(Self::Ethereum),
            "eosio" | "eos" => Ok(Self::Eosio),
            other => Err(format!("Unsupported blockchain: {}", other)),
        }
    }
}

/// Supported pegged tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PToken {
    #[serde(alias = "pBTC")]
    Pbtc,
    #[serde(alias = "pLTC")]
    Pltc,
}

impl PToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pbtc => "pbtc",
            Self::Pltc => "pltc",
        }
    }

    /// Display symbol (e.g. "pBTC")
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pbtc => "pBTC",
            Self::Pltc => "pLTC",
        }
    }

    /// The chain holding the original asset
    pub fn native_blockchain(&self) -> Blockchain {
        match self {
            Self::Pbtc => Blockchain::Bitcoin,
            Self::Pltc => Blockchain::Litecoin,
        }
    }
}

impl fmt::Display for PToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for PToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pbtc" => Ok(Self::Pbtc),
            "pltc" => Ok(Self::Pltc),
            other => Err(format!("Unsupported pToken: {}", other)),
        }
    }
}

/// Native/host blockchain + network pairing a bridge node must serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainPairing {
    pub native_blockchain: Blockchain,
    pub native_network: Network,
    pub host_blockchain: Blockchain,
    pub host_network: Network,
}

impl fmt::Display for ChainPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.native_blockchain, self.native_network, self.host_blockchain, self.host_network
        )
    }
}

/// Immutable per-client pToken configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PTokenConfig {
    pub ptoken: PToken,
    pub pairing: ChainPairing,
    /// Candidate node endpoints in priority order
    pub nodes: Vec<String>,
    /// Preferred node, tried before every other candidate
    pub default_node: Option<String>,
}

impl PTokenConfig {
    pub fn new(ptoken: PToken, host_blockchain: Blockchain, network: Network) -> Self {
        Self {
            ptoken,
            pairing: ChainPairing {
                native_blockchain: ptoken.native_blockchain(),
                native_network: network,
                host_blockchain,
                host_network: network,
            },
            nodes: Vec::new(),
            default_node: None,
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_default_node(mut self, node: impl Into<String>) -> Self {
        self.default_node = Some(node.into());
        self
    }

    /// Candidate endpoints in priority order: explicit default first, no duplicates
    pub fn candidate_endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::with_capacity(self.nodes.len() + 1);
        for endpoint in self.default_node.iter().chain(self.nodes.iter()) {
            if !endpoints.contains(endpoint) {
                endpoints.push(endpoint.clone());
            }
        }
        endpoints
    }
}

/// Block height
pub type BlockHeight = u64;
