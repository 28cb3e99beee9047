//! Bridge node selection
//!
//! Candidates are probed concurrently, but the decision follows priority
//! order: the first candidate that answers `ping` and reports the configured
//! pairing wins. The choice is cached until `clear()` or the next `select()`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use ptokens_core::{ChainPairing, PTokenConfig, TransferError};
use tokio::sync::RwLock;

use crate::{BridgeNode, NodeClient, NodeInfo};

/// A node that passed the liveness and pairing checks
#[derive(Clone)]
pub struct SelectedNode {
    pub client: Arc<dyn BridgeNode>,
    pub info: NodeInfo,
}

impl SelectedNode {
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Node public key as reported by `/info`
    pub fn public_key(&self) -> &str {
        &self.info.public_key
    }
}

impl fmt::Debug for SelectedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedNode")
            .field("endpoint", &self.client.endpoint())
            .field("info", &self.info)
            .finish()
    }
}

/// Result of probing one candidate
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// Live and serving the requested pairing
    Matched(NodeInfo),
    /// Live but paired differently (unusable, not an error)
    Mismatched { reported: String },
    /// No usable answer within the probe timeout
    Unreachable { reason: String },
}

/// Check liveness and pairing of a single node within `timeout`
pub async fn probe_node(
    node: &dyn BridgeNode,
    pairing: &ChainPairing,
    timeout: Duration,
) -> ProbeOutcome {
    let probe = async {
        match node.ping().await {
            Ok(pong) if pong == "pong" => {}
            Ok(other) => {
                return ProbeOutcome::Unreachable {
                    reason: format!("unexpected ping answer {:?}", other),
                }
            }
            Err(e) => {
                return ProbeOutcome::Unreachable {
                    reason: e.to_string(),
                }
            }
        }

        match node.get_info().await {
            Ok(info) if info.serves(pairing) => ProbeOutcome::Matched(info),
            Ok(info) => ProbeOutcome::Mismatched {
                reported: info.reported_pairing(),
            },
            Err(e) => ProbeOutcome::Unreachable {
                reason: e.to_string(),
            },
        }
    };

    match tokio::time::timeout(timeout, probe).await {
        Ok(outcome) => outcome,
        Err(_) => ProbeOutcome::Unreachable {
            reason: format!("probe timed out after {}ms", timeout.as_millis()),
        },
    }
}

/// Chooses and caches the bridge node for one chain pairing
pub struct NodeSelector {
    pairing: ChainPairing,
    candidates: Vec<Arc<dyn BridgeNode>>,
    probe_timeout: Duration,
    selected: Arc<RwLock<Option<SelectedNode>>>,
}

impl NodeSelector {
    /// Candidates must already be in priority order
    pub fn new(
        pairing: ChainPairing,
        candidates: Vec<Arc<dyn BridgeNode>>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            pairing,
            candidates,
            probe_timeout,
            selected: Arc::new(RwLock::new(None)),
        }
    }

    /// Build HTTP clients for every configured endpoint
    pub fn from_config(config: &PTokenConfig, probe_timeout: Duration) -> crate::Result<Self> {
        let candidates = config
            .candidate_endpoints()
            .into_iter()
            .map(|endpoint| NodeClient::new(endpoint).map(|c| Arc::new(c) as Arc<dyn BridgeNode>))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self::new(config.pairing, candidates, probe_timeout))
    }

    pub fn pairing(&self) -> &ChainPairing {
        &self.pairing
    }

    /// Probe all candidates and cache the first usable one in priority order
    pub async fn select(&self) -> Result<SelectedNode, TransferError> {
        if self.candidates.is_empty() {
            return Err(TransferError::NoNodeAvailable {
                pairing: self.pairing.to_string(),
                reason: "no candidate nodes configured".to_string(),
            });
        }

        let outcomes = join_all(
            self.candidates
                .iter()
                .map(|node| probe_node(node.as_ref(), &self.pairing, self.probe_timeout)),
        )
        .await;

        let mut rejected = Vec::new();
        for (node, outcome) in self.candidates.iter().zip(outcomes) {
            match outcome {
                ProbeOutcome::Matched(info) => {
                    tracing::info!(
                        endpoint = %node.endpoint(),
                        pairing = %self.pairing,
                        "Selected bridge node"
                    );
                    let selected = SelectedNode {
                        client: Arc::clone(node),
                        info,
                    };
                    *self.selected.write().await = Some(selected.clone());
                    return Ok(selected);
                }
                ProbeOutcome::Mismatched { reported } => {
                    tracing::debug!(
                        endpoint = %node.endpoint(),
                        reported = %reported,
                        "Skipping node serving another pairing"
                    );
                    rejected.push(format!("{} serves {}", node.endpoint(), reported));
                }
                ProbeOutcome::Unreachable { reason } => {
                    tracing::debug!(
                        endpoint = %node.endpoint(),
                        reason = %reason,
                        "Skipping unreachable node"
                    );
                    rejected.push(format!("{} unreachable ({})", node.endpoint(), reason));
                }
            }
        }

        tracing::warn!(pairing = %self.pairing, "No bridge node available");
        Err(TransferError::NoNodeAvailable {
            pairing: self.pairing.to_string(),
            reason: rejected.join("; "),
        })
    }

    /// Currently cached node, if any
    pub async fn selected(&self) -> Option<SelectedNode> {
        self.selected.read().await.clone()
    }

    /// Cached node, selecting one first when none is cached
    pub async fn selected_or_select(&self) -> Result<SelectedNode, TransferError> {
        if let Some(node) = self.selected().await {
            return Ok(node);
        }
        self.select().await
    }

    /// Forget the cached node
    pub async fn clear(&self) {
        *self.selected.write().await = None;
    }
}
