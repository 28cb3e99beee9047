//! bridge-node-client: HTTP client for pTokens bridge nodes with node selection
//!
//! A bridge node custodies native funds and mints/burns the pegged token. It
//! is semi-trusted: its answers drive progress reporting, but deposit
//! addresses are always re-derived locally before use.

pub mod selector;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use ptokens_core::{BlockHeight, NodeError};
use serde::de::DeserializeOwned;

pub use selector::{probe_node, NodeSelector, ProbeOutcome, SelectedNode};
pub use types::{
    DepositAddressResponse, IncomingTxStatus, NodeInfo, Report, ReportFilter, ReportSide,
};

/// Default timeout for node API calls (30 seconds).
const NODE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "ptokens-rs";

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// The part of the node protocol the transfer engine depends on.
///
/// `NodeClient` is the HTTP implementation; tests substitute stubs.
#[async_trait]
pub trait BridgeNode: Send + Sync {
    /// Base URL of the node
    fn endpoint(&self) -> &str;

    /// Liveness probe, answers `"pong"`
    async fn ping(&self) -> Result<String>;

    /// Node metadata
    async fn get_info(&self) -> Result<NodeInfo>;

    /// Processing status of a transaction sent towards the node
    async fn get_incoming_transaction_status(&self, tx_id: &str) -> Result<IncomingTxStatus>;

    /// Request a fresh nonce and deposit address for `host_address`
    async fn generate_deposit_address(&self, host_address: &str)
        -> Result<DepositAddressResponse>;
}

/// HTTP bridge node client
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NodeClient {
    /// Create a client for the node at `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(NODE_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NodeError::Unreachable {
                url: format!("{}: {}", endpoint, e),
            })?;

        Ok(Self::with_http_client(endpoint, http))
    }

    /// Create a client sharing an existing `reqwest::Client`
    pub fn with_http_client(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Check if node answers the liveness probe
    pub async fn is_online(&self) -> bool {
        matches!(BridgeNode::ping(self).await, Ok(pong) if pong == "pong")
    }

    // =========================================================================
    // Report queries
    // =========================================================================

    /// Latest reports for one side of the bridge
    pub async fn get_reports(&self, side: ReportSide, limit: u32) -> Result<Vec<Report>> {
        self.get_json(
            "/reports",
            &[("side", side.as_str().to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Latest host-side reports
    pub async fn get_host_reports(&self, limit: u32) -> Result<Vec<Report>> {
        self.get_reports(ReportSide::Host, limit).await
    }

    /// Latest native-side reports
    pub async fn get_native_reports(&self, limit: u32) -> Result<Vec<Report>> {
        self.get_reports(ReportSide::Native, limit).await
    }

    /// Reports filtered by sender, recipient, native or host address
    pub async fn get_reports_by(&self, filter: &ReportFilter, limit: u32) -> Result<Vec<Report>> {
        let (key, value) = filter.query_param();
        self.get_json(
            "/reports",
            &[(key, value.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// The report for the transaction that triggered a node action
    pub async fn get_report_by_incoming_tx_hash(&self, hash: &str) -> Result<Report> {
        self.get_json("/reports", &[("incoming_tx_hash", hash.to_string())])
            .await
    }

    /// The report for a transaction the node broadcast
    pub async fn get_report_by_broadcast_tx_hash(&self, hash: &str) -> Result<Report> {
        self.get_json("/reports", &[("broadcast_tx_hash", hash.to_string())])
            .await
    }

    /// Last native block the node has processed
    pub async fn get_last_processed_native_block(&self) -> Result<BlockHeight> {
        Ok(BridgeNode::get_info(self).await?.last_processed_native_block)
    }

    /// Last host block the node has processed
    pub async fn get_last_processed_host_block(&self) -> Result<BlockHeight> {
        Ok(BridgeNode::get_info(self).await?.last_processed_host_block)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = self.url(path);
        timed_request(async {
            let response = self
                .http
                .get(&url)
                .query(query)
                .send()
                .await
                .map_err(|e| NodeError::Unreachable {
                    url: format!("{}: {}", url, e),
                })?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(NodeError::NotFound { what: url.clone() });
            }

            let body = response.text().await.map_err(|e| NodeError::ApiError {
                message: format!("Failed to read response from {}: {}", url, e),
            })?;

            if !status.is_success() {
                return Err(NodeError::ApiError {
                    message: format!("{} returned {}: {}", url, status, body),
                });
            }

            Ok(body)
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get_text(path, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| NodeError::ParseError(format!("{} from {}: {}", e, path, body)))
    }
}

#[async_trait]
impl BridgeNode for NodeClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<String> {
        let body = self.get_text("/ping", &[]).await?;
        Ok(body.trim().trim_matches('"').to_string())
    }

    async fn get_info(&self) -> Result<NodeInfo> {
        self.get_json("/info", &[]).await
    }

    async fn get_incoming_transaction_status(&self, tx_id: &str) -> Result<IncomingTxStatus> {
        self.get_json(&format!("/incoming-tx-status/{}", tx_id), &[])
            .await
    }

    async fn generate_deposit_address(
        &self,
        host_address: &str,
    ) -> Result<DepositAddressResponse> {
        tracing::debug!(
            endpoint = %self.endpoint,
            host_address = %host_address,
            "Requesting deposit address"
        );
        self.get_json(&format!("/deposit-address/{}", host_address), &[])
            .await
    }
}

/// Wrap a node API call with a timeout so a stalled node cannot hang a caller.
async fn timed_request<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(NODE_REQUEST_TIMEOUT, fut)
        .await
        .map_err(|_| NodeError::ApiError {
            message: format!(
                "Node request timed out after {}s",
                NODE_REQUEST_TIMEOUT.as_secs()
            ),
        })?
}
