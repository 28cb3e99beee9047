//! Transfer stages and progress events

use std::fmt;

use bridge_node_client::IncomingTxStatus;
use host_chain::HostReceipt;
use ptokens_core::{TransferError, TxId};

/// Which way value moves across the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Native asset in, pToken minted on the host chain
    Issue,
    /// pToken burned on the host chain, native asset paid out
    Redeem,
}

/// Lifecycle stage of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PendingNativeBroadcast,
    NativeBroadcasted,
    NativeConfirmed,
    PendingHostBroadcast,
    HostBroadcasted,
    HostConfirmed,
    NodeReceived,
    NodeBroadcasted,
}

const ISSUE_ORDER: [Stage; 6] = [
    Stage::PendingNativeBroadcast,
    Stage::NativeBroadcasted,
    Stage::NativeConfirmed,
    Stage::NodeReceived,
    Stage::NodeBroadcasted,
    Stage::HostConfirmed,
];

const REDEEM_ORDER: [Stage; 6] = [
    Stage::PendingHostBroadcast,
    Stage::HostBroadcasted,
    Stage::HostConfirmed,
    Stage::NodeReceived,
    Stage::NodeBroadcasted,
    Stage::NativeConfirmed,
];

impl Direction {
    /// Stages in the order a transfer in this direction goes through them
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Self::Issue => &ISSUE_ORDER,
            Self::Redeem => &REDEEM_ORDER,
        }
    }

    pub fn initial_stage(&self) -> Stage {
        self.stages()[0]
    }

    /// Position of `stage` in this direction, `None` if it does not occur
    pub fn rank(&self, stage: Stage) -> Option<usize> {
        self.stages().iter().position(|s| *s == stage)
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingNativeBroadcast => "PENDING_NATIVE_BROADCAST",
            Self::NativeBroadcasted => "NATIVE_BROADCASTED",
            Self::NativeConfirmed => "NATIVE_CONFIRMED",
            Self::PendingHostBroadcast => "PENDING_HOST_BROADCAST",
            Self::HostBroadcasted => "HOST_BROADCASTED",
            Self::HostConfirmed => "HOST_CONFIRMED",
            Self::NodeReceived => "NODE_RECEIVED",
            Self::NodeBroadcasted => "NODE_BROADCASTED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    InProgress(Stage),
    Completed,
    Failed(TransferError),
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }
}

/// Progress event published on a transfer handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    NativeTxBroadcasted { tx_id: TxId },
    NativeTxConfirmed { tx_id: TxId },
    HostTxBroadcasted { tx_id: TxId },
    HostTxConfirmed { receipt: HostReceipt },
    NodeReceivedTx {
        incoming_tx: TxId,
        status: IncomingTxStatus,
    },
    NodeBroadcastedTx {
        incoming_tx: TxId,
        broadcast_tx: TxId,
        status: IncomingTxStatus,
    },
}

impl TransferEvent {
    pub fn stage(&self) -> Stage {
        match self {
            Self::NativeTxBroadcasted { .. } => Stage::NativeBroadcasted,
            Self::NativeTxConfirmed { .. } => Stage::NativeConfirmed,
            Self::HostTxBroadcasted { .. } => Stage::HostBroadcasted,
            Self::HostTxConfirmed { .. } => Stage::HostConfirmed,
            Self::NodeReceivedTx { .. } => Stage::NodeReceived,
            Self::NodeBroadcastedTx { .. } => Stage::NodeBroadcasted,
        }
    }

    /// Every listener name this event is known under, current name last
    pub fn event_names(&self) -> &'static [&'static str] {
        match self {
            Self::NativeTxBroadcasted { .. } => &["onBtcTxBroadcasted", "nativeTxBroadcasted"],
            Self::NativeTxConfirmed { .. } => &["onBtcTxConfirmed", "nativeTxConfirmed"],
            Self::HostTxBroadcasted { .. } => &["hostTxBroadcasted"],
            Self::HostTxConfirmed { .. } => &["onEthTxConfirmed", "hostTxConfirmed"],
            Self::NodeReceivedTx { .. } => {
                &["onEnclaveReceivedTx", "onNodeReceivedTx", "nodeReceivedTx"]
            }
            Self::NodeBroadcastedTx { .. } => &[
                "onEnclaveBroadcastedTx",
                "onNodeBroadcastedTx",
                "nodeBroadcastedTx",
            ],
        }
    }

    /// Transaction the event is about
    pub fn tx_id(&self) -> &TxId {
        match self {
            Self::NativeTxBroadcasted { tx_id }
            | Self::NativeTxConfirmed { tx_id }
            | Self::HostTxBroadcasted { tx_id } => tx_id,
            Self::HostTxConfirmed { receipt } => &receipt.tx_hash,
            Self::NodeReceivedTx { incoming_tx, .. } => incoming_tx,
            Self::NodeBroadcastedTx { broadcast_tx, .. } => broadcast_tx,
        }
    }

    /// Whether a listener registered under `name` should receive this event
    pub fn matches_name(&self, name: &str) -> bool {
        self.event_names().contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_orders() {
        let issue = Direction::Issue;
        assert_eq!(issue.initial_stage(), Stage::PendingNativeBroadcast);
        assert!(issue.rank(Stage::NativeBroadcasted) < issue.rank(Stage::NativeConfirmed));
        assert!(issue.rank(Stage::NodeBroadcasted) < issue.rank(Stage::HostConfirmed));
        assert_eq!(issue.rank(Stage::HostBroadcasted), None);

        let redeem = Direction::Redeem;
        assert!(redeem.rank(Stage::HostConfirmed) < redeem.rank(Stage::NodeReceived));
        assert_eq!(redeem.rank(Stage::NativeConfirmed), Some(5));
        assert_eq!(redeem.rank(Stage::NativeBroadcasted), None);
    }

    #[test]
    fn test_event_aliases() {
        let event = TransferEvent::NodeReceivedTx {
            incoming_tx: TxId::from("61b2"),
            status: IncomingTxStatus {
                broadcast: false,
                broadcast_tx_hash: None,
            },
        };
        assert!(event.matches_name("onEnclaveReceivedTx"));
        assert!(event.matches_name("nodeReceivedTx"));
        assert!(!event.matches_name("nodeBroadcastedTx"));
        assert_eq!(event.stage(), Stage::NodeReceived);
    }

    #[test]
    fn test_host_confirmed_aliases() {
        let event = TransferEvent::HostTxConfirmed {
            receipt: HostReceipt {
                tx_hash: TxId::from("0x9864"),
                success: true,
                block_number: Some(8_391_200),
            },
        };
        assert_eq!(event.event_names(), &["onEthTxConfirmed", "hostTxConfirmed"]);
        assert_eq!(event.tx_id().as_str(), "0x9864");
    }
}
