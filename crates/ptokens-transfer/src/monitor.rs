//! Transfer monitor: the polling loops that follow a transfer across chains
//!
//! Issue: native deposit -> node incoming status -> host receipt.
//! Redeem: host receipt -> node incoming status -> native payout.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_node_client::{BridgeNode, NodeSelector};
use host_chain::{HostChain, HostReceipt};
use native_chain::{NativeExplorer, TxStatus};
use ptokens_core::{ChainError, MonitorConfig, NodeError, TransferError, TxId};
use serde::Serialize;

use crate::events::{Direction, TransferEvent};
use crate::handle::{Progress, TransferHandle};
use crate::poll::{poll_until, Poll, PollSchedule};

/// Outcome of a completed issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueResult {
    pub deposit_address: String,
    pub native_tx: TxId,
    pub host_tx: TxId,
}

/// Polling loops over the native explorer, a bridge node and the host chain
#[derive(Clone)]
pub struct Monitor {
    explorer: Arc<dyn NativeExplorer>,
    host: Arc<dyn HostChain>,
    config: MonitorConfig,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Monitor {
    pub fn new(
        explorer: Arc<dyn NativeExplorer>,
        host: Arc<dyn HostChain>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            explorer,
            host,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn HostChain> {
        &self.host
    }

    /// Wait for a payment to `address` to confirm on the native chain.
    ///
    /// Keys on the first transaction observed; later payments to the same
    /// address are logged and ignored.
    pub async fn wait_native_deposit(
        &self,
        address: &str,
        progress: &Progress,
    ) -> Result<TxId, TransferError> {
        let schedule = PollSchedule::with_config(self.config.native_poll_interval(), &self.config);
        let explorer = self.explorer.as_ref();
        let first_seen: Mutex<Option<TxId>> = Mutex::new(None);
        let first_seen = &first_seen;

        poll_until("native explorer", &schedule, || async move {
            let mempool = explorer.mempool_txs(address).await?;
            let utxos = explorer.utxos(address).await?;

            let keyed = {
                let mut seen = lock(first_seen);
                if seen.is_none() {
                    let candidate = mempool
                        .first()
                        .map(|tx| tx.txid.clone())
                        .or_else(|| utxos.first().map(|u| u.txid.clone()));
                    if let Some(txid) = candidate {
                        *seen = Some(TxId::new(txid));
                    }
                }
                seen.clone()
            };

            let Some(keyed) = keyed else {
                return Ok(Poll::Pending);
            };

            for tx in mempool.iter().filter(|tx| tx.txid != keyed.as_str()) {
                tracing::warn!(
                    address = %address,
                    txid = %tx.txid,
                    tracked = %keyed,
                    "Ignoring additional payment to deposit address"
                );
            }

            progress.emit(TransferEvent::NativeTxBroadcasted {
                tx_id: keyed.clone(),
            });

            let confirmed = utxos
                .iter()
                .any(|u| u.txid == keyed.as_str() && u.status.confirmed);
            if confirmed {
                progress.emit(TransferEvent::NativeTxConfirmed {
                    tx_id: keyed.clone(),
                });
                Ok(Poll::Ready(keyed))
            } else {
                Ok(Poll::Pending)
            }
        })
        .await
    }

    /// Wait for the node to act on `incoming_tx`; returns the tx it broadcast
    pub async fn wait_node_broadcast(
        &self,
        node: &dyn BridgeNode,
        incoming_tx: &TxId,
        progress: &Progress,
    ) -> Result<TxId, TransferError> {
        let schedule = PollSchedule::with_config(self.config.node_poll_interval(), &self.config);

        poll_until("bridge node", &schedule, || async move {
            let status = match node.get_incoming_transaction_status(incoming_tx.as_str()).await {
                Ok(status) => status,
                // not seen by the node yet
                Err(NodeError::NotFound { .. }) => return Ok(Poll::Pending),
                Err(e) => return Err(e.into()),
            };

            progress.emit(TransferEvent::NodeReceivedTx {
                incoming_tx: incoming_tx.clone(),
                status: status.clone(),
            });

            if !status.broadcast {
                return Ok(Poll::Pending);
            }

            let Some(hash) = status.broadcast_tx_hash.clone() else {
                return Err(TransferError::NodeReportedFailure {
                    message: format!(
                        "node reports {} broadcast without a transaction hash",
                        incoming_tx
                    ),
                });
            };

            let broadcast_tx = TxId::new(hash);
            progress.emit(TransferEvent::NodeBroadcastedTx {
                incoming_tx: incoming_tx.clone(),
                broadcast_tx: broadcast_tx.clone(),
                status,
            });
            Ok(Poll::Ready(broadcast_tx))
        })
        .await
    }

    /// Wait for a host transaction to be mined successfully
    pub async fn wait_host_confirmation(
        &self,
        tx: &TxId,
        progress: &Progress,
    ) -> Result<HostReceipt, TransferError> {
        let schedule = PollSchedule::with_config(self.config.host_poll_interval(), &self.config);
        let host = self.host.as_ref();

        poll_until("host chain", &schedule, || async move {
            match host.transaction_receipt(tx.as_str()).await? {
                None => Ok(Poll::Pending),
                Some(receipt) if receipt.success => {
                    progress.emit(TransferEvent::HostTxConfirmed {
                        receipt: receipt.clone(),
                    });
                    Ok(Poll::Ready(receipt))
                }
                Some(_) => Err(TransferError::HostTxFailed {
                    tx_hash: tx.to_string(),
                }),
            }
        })
        .await
    }

    /// Wait for the node's native payout to confirm
    pub async fn wait_native_payout(
        &self,
        tx: &TxId,
        progress: &Progress,
    ) -> Result<TxStatus, TransferError> {
        let schedule = PollSchedule::with_config(self.config.native_poll_interval(), &self.config);
        let explorer = self.explorer.as_ref();

        poll_until("native explorer", &schedule, || async move {
            match explorer.tx_status(tx.as_str()).await {
                Ok(status) if status.confirmed => {
                    progress.emit(TransferEvent::NativeTxConfirmed { tx_id: tx.clone() });
                    Ok(Poll::Ready(status))
                }
                Ok(_) | Err(ChainError::NotFound { .. }) => Ok(Poll::Pending),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Follow a deposit to `deposit_address` until the pToken is minted.
    ///
    /// The node is resolved from `selector` inside the transfer task.
    pub fn watch_issue(
        &self,
        selector: Arc<NodeSelector>,
        deposit_address: String,
        max_wait: Option<Duration>,
    ) -> TransferHandle<IssueResult> {
        let monitor = self.clone();

        TransferHandle::spawn(Direction::Issue, max_wait, move |progress| async move {
            let node = selector.selected_or_select().await?;
            tracing::info!(
                address = %deposit_address,
                node = %node.endpoint(),
                "Waiting for deposit"
            );

            let native_tx = monitor
                .wait_native_deposit(&deposit_address, &progress)
                .await?;
            let host_tx = monitor
                .wait_node_broadcast(node.client.as_ref(), &native_tx, &progress)
                .await?;
            monitor.wait_host_confirmation(&host_tx, &progress).await?;

            Ok(IssueResult {
                deposit_address,
                native_tx,
                host_tx,
            })
        })
    }
}
