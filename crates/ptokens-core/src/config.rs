//! Configuration types for the pTokens client

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Blockchain, Error, Network, PToken, PTokenConfig};

/// Polling configuration for the transfer monitor.
///
/// Every data source has its own interval. Transient fetch errors double the
/// wait up to `max_backoff_ms`; after `max_consecutive_failures` failed polls
/// in a row the error is surfaced on the transfer handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Native explorer (mempool / utxo) polling interval
    #[serde(default = "default_native_poll_ms")]
    pub native_poll_ms: u64,

    /// Bridge node incoming-tx status polling interval
    #[serde(default = "default_node_poll_ms")]
    pub node_poll_ms: u64,

    /// Host chain receipt polling interval
    #[serde(default = "default_host_poll_ms")]
    pub host_poll_ms: u64,

    /// Backoff ceiling for transient fetch errors
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Consecutive transient failures tolerated per poll loop
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Liveness/metadata probe timeout used by node selection
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Optional upper bound on a whole transfer (None = wait for the chains)
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
}

fn default_native_poll_ms() -> u64 {
    5_000
}

fn default_node_poll_ms() -> u64 {
    3_000
}

fn default_host_poll_ms() -> u64 {
    3_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_max_consecutive_failures() -> u32 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    4_000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            native_poll_ms: default_native_poll_ms(),
            node_poll_ms: default_node_poll_ms(),
            host_poll_ms: default_host_poll_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_wait_secs: None,
        }
    }
}

impl MonitorConfig {
    pub fn native_poll_interval(&self) -> Duration {
        Duration::from_millis(self.native_poll_ms)
    }

    pub fn node_poll_interval(&self) -> Duration {
        Duration::from_millis(self.node_poll_ms)
    }

    pub fn host_poll_interval(&self) -> Duration {
        Duration::from_millis(self.host_poll_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}

/// Host chain connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host RPC URL: Ethereum JSON-RPC (e.g. "http://127.0.0.1:8545") or
    /// EOSIO chain/history API
    pub rpc_url: String,

    /// Account used to submit redeem transactions. The RPC endpoint's
    /// account manager (or the EOSIO signer) holds its key.
    #[serde(default)]
    pub account: Option<String>,

    /// EOSIO signer endpoint, defaults to `rpc_url`
    #[serde(default)]
    pub signer_url: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            account: None,
            signer_url: None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Token to issue/redeem
    pub ptoken: PToken,

    /// Chain the pToken is minted on
    pub host_blockchain: Blockchain,

    /// Network (applies to both native and host chain)
    pub network: Network,

    /// Candidate bridge node endpoints in priority order
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Preferred bridge node
    #[serde(default)]
    pub default_node: Option<String>,

    /// Native explorer (Esplora) base URL; defaults per chain and network
    #[serde(default)]
    pub explorer_url: Option<String>,

    /// Host chain settings
    #[serde(default)]
    pub host: HostConfig,

    /// Polling settings
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ptoken: PToken::Pbtc,
            host_blockchain: Blockchain::Ethereum,
            network: Network::Mainnet,
            nodes: Vec::new(),
            default_node: None,
            explorer_url: None,
            host: HostConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: ClientConfig =
            serde_json::from_str(&content).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject pairings the client cannot serve
    pub fn validate(&self) -> Result<(), Error> {
        if self.host_blockchain.is_utxo() {
            return Err(Error::Config(format!(
                "{} cannot be used as host blockchain",
                self.host_blockchain
            )));
        }
        if self.nodes.is_empty() && self.default_node.is_none() {
            return Err(Error::Config("No bridge node configured".to_string()));
        }
        Ok(())
    }

    /// Derive the immutable per-client pToken configuration
    pub fn ptoken_config(&self) -> PTokenConfig {
        let config = PTokenConfig::new(self.ptoken, self.host_blockchain, self.network)
            .with_nodes(self.nodes.clone());
        match &self.default_node {
            Some(node) => config.with_default_node(node.clone()),
            None => config,
        }
    }
}
