//! Redeem orchestration: burn on the host chain, follow the native payout

use std::sync::Arc;

use bridge_node_client::{NodeSelector, SelectedNode};
use host_chain::{RedeemCall, RedeemOptions};
use native_chain::{remap_legacy_p2sh, validate_address, NativeParams};
use ptokens_core::{format_amount, to_on_chain, TransferError, TxId};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::events::{Direction, TransferEvent};
use crate::handle::{Progress, TransferHandle};
use crate::monitor::Monitor;

/// Outcome of a completed redeem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedeemResult {
    /// Redeemed amount with exactly the host token's decimals
    pub amount: String,
    pub host_tx: TxId,
    pub native_tx: TxId,
    /// Destination as given by the caller
    pub to: String,
}

/// Checks applied before any redeem I/O
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemRules {
    pub symbol: String,
    pub minimum: Decimal,
    pub native_params: NativeParams,
    pub host_decimals: u32,
}

impl RedeemRules {
    /// Validate amount and destination; returns the on-chain burn amount
    pub fn check(&self, amount: Decimal, destination: &str) -> Result<u128, TransferError> {
        if amount < self.minimum {
            return Err(TransferError::BelowMinimum {
                amount: amount.normalize().to_string(),
                minimum: self.minimum.normalize().to_string(),
                symbol: self.symbol.clone(),
            });
        }

        let remapped = remap_legacy_p2sh(destination, &self.native_params);
        validate_address(&remapped, &self.native_params).map_err(|e| {
            TransferError::InvalidAddress {
                chain: self.native_params.blockchain.to_string(),
                address: destination.to_string(),
                reason: e.to_string(),
            }
        })?;

        to_on_chain(amount, self.host_decimals).map_err(|e| TransferError::InvalidAmount {
            message: e.to_string(),
        })
    }
}

/// Runs redeems against the selected node and the host chain
#[derive(Clone)]
pub struct Redeemer {
    selector: Arc<NodeSelector>,
    monitor: Monitor,
    rules: RedeemRules,
    contract: Arc<RwLock<Option<String>>>,
}

impl Redeemer {
    pub fn new(selector: Arc<NodeSelector>, monitor: Monitor, rules: RedeemRules) -> Self {
        Self {
            selector,
            monitor,
            rules,
            contract: Arc::new(RwLock::new(None)),
        }
    }

    pub fn rules(&self) -> &RedeemRules {
        &self.rules
    }

    /// pToken contract on the host chain, fetched from the node once
    pub async fn contract_address(&self, node: &SelectedNode) -> Result<String, TransferError> {
        if let Some(address) = self.contract.read().await.as_ref() {
            return Ok(address.clone());
        }

        let info = node.client.get_info().await?;
        let address = info
            .smart_contract_address
            .ok_or_else(|| TransferError::NodeReportedFailure {
                message: format!("{} reports no smart contract address", node.endpoint()),
            })?;

        tracing::debug!(contract = %address, "Cached pToken contract address");
        *self.contract.write().await = Some(address.clone());
        Ok(address)
    }

    /// Burn `amount` pTokens and pay out to `destination` on the native chain.
    ///
    /// Precondition failures reject the handle before any network call.
    pub fn redeem(
        &self,
        amount: Decimal,
        destination: &str,
        options: RedeemOptions,
    ) -> TransferHandle<RedeemResult> {
        let on_chain_amount = match self.rules.check(amount, destination) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    amount = %amount,
                    destination = %destination,
                    error = %e,
                    "Redeem rejected"
                );
                return TransferHandle::rejected(Direction::Redeem, e);
            }
        };

        let this = self.clone();
        let destination = destination.to_string();
        let max_wait = options.max_wait.or_else(|| self.monitor.config().max_wait());

        TransferHandle::spawn(Direction::Redeem, max_wait, move |progress| async move {
            this.run(amount, on_chain_amount, destination, options, &progress)
                .await
        })
    }

    async fn run(
        &self,
        amount: Decimal,
        on_chain_amount: u128,
        destination: String,
        options: RedeemOptions,
        progress: &Progress,
    ) -> Result<RedeemResult, TransferError> {
        let node = self.selector.selected_or_select().await?;
        let contract = self.contract_address(&node).await?;

        let call = RedeemCall {
            contract,
            amount: on_chain_amount,
            destination: destination.clone(),
            options,
        };
        let host_tx = self.monitor.host().submit_redeem(&call).await?;
        progress.emit(TransferEvent::HostTxBroadcasted {
            tx_id: host_tx.clone(),
        });

        self.monitor.wait_host_confirmation(&host_tx, progress).await?;
        let native_tx = self
            .monitor
            .wait_node_broadcast(node.client.as_ref(), &host_tx, progress)
            .await?;
        self.monitor.wait_native_payout(&native_tx, progress).await?;

        Ok(RedeemResult {
            amount: format_amount(amount, self.rules.host_decimals),
            host_tx,
            native_tx,
            to: destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Stage;
    use crate::monitor::tests::{
        broadcast_status, fast_config, not_found, pending_status, ScriptedExplorer, ScriptedHost,
        ScriptedNode,
    };
    use bridge_node_client::BridgeNode;
    use ptokens_core::{Blockchain, Network, PToken, PTokenConfig};
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::time::Duration;

    fn ltc_testnet() -> NativeParams {
        NativeParams::for_chain(Blockchain::Litecoin, Network::Testnet).unwrap()
    }

    fn rules() -> RedeemRules {
        RedeemRules {
            symbol: "pLTC".into(),
            minimum: Decimal::from_str("0.00005").unwrap(),
            native_params: ltc_testnet(),
            host_decimals: 18,
        }
    }

    fn encode(version: u8) -> String {
        let mut payload = vec![version];
        payload.extend_from_slice(&[0x22; 20]);
        bitcoin::base58::encode_check(&payload)
    }

    #[test]
    fn test_below_minimum_rejected() {
        let err = rules()
            .check(Decimal::from_str("0.00001").unwrap(), &encode(0x3a))
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::BelowMinimum {
                amount: "0.00001".into(),
                minimum: "0.00005".into(),
                symbol: "pLTC".into(),
            }
        );
    }

    #[test]
    fn test_legacy_destination_accepted() {
        let amount = rules()
            .check(Decimal::from_str("0.5").unwrap(), &encode(0xc4))
            .unwrap();
        assert_eq!(amount, 500_000_000_000_000_000);
    }

    #[test]
    fn test_invalid_destination_after_remap() {
        // Litecoin mainnet legacy version is not remapped on testnet
        let err = rules().check(Decimal::ONE, &encode(0x05)).unwrap_err();
        assert_eq!(err.error_code(), "invalid_address");
    }

    /// Node wrapper counting every call made to it
    struct CountingNode {
        inner: ScriptedNode,
        calls: Mutex<u32>,
    }

    #[async_trait::async_trait]
    impl BridgeNode for CountingNode {
        fn endpoint(&self) -> &str {
            self.inner.endpoint()
        }

        async fn ping(&self) -> bridge_node_client::Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.inner.ping().await
        }

        async fn get_info(&self) -> bridge_node_client::Result<bridge_node_client::NodeInfo> {
            *self.calls.lock().unwrap() += 1;
            self.inner.get_info().await
        }

        async fn get_incoming_transaction_status(
            &self,
            tx_id: &str,
        ) -> bridge_node_client::Result<bridge_node_client::IncomingTxStatus> {
            *self.calls.lock().unwrap() += 1;
            self.inner.get_incoming_transaction_status(tx_id).await
        }

        async fn generate_deposit_address(
            &self,
            host_address: &str,
        ) -> bridge_node_client::Result<bridge_node_client::DepositAddressResponse> {
            *self.calls.lock().unwrap() += 1;
            self.inner.generate_deposit_address(host_address).await
        }
    }

    fn redeemer(
        node: Arc<dyn BridgeNode>,
        explorer: ScriptedExplorer,
        host: Arc<ScriptedHost>,
    ) -> Redeemer {
        let pairing =
            PTokenConfig::new(PToken::Pltc, Blockchain::Ethereum, Network::Testnet).pairing;
        let selector = NodeSelector::new(pairing, vec![node], Duration::from_secs(4));
        let monitor = Monitor::new(Arc::new(explorer), host, fast_config());
        Redeemer::new(Arc::new(selector), monitor, rules())
    }

    #[tokio::test]
    async fn test_redeem_below_minimum_makes_no_calls() {
        let node = Arc::new(CountingNode {
            inner: ScriptedNode::new(vec![]),
            calls: Mutex::new(0),
        });
        let host = Arc::new(ScriptedHost::default());
        let redeemer = redeemer(node.clone(), ScriptedExplorer::default(), host.clone());

        let mut handle = redeemer.redeem(
            Decimal::from_str("0.00001").unwrap(),
            &encode(0x3a),
            RedeemOptions::default(),
        );

        let err = handle.result().await.unwrap_err();
        assert_eq!(err.error_code(), "below_minimum");
        assert_eq!(handle.next_event().await, None);
        assert_eq!(*node.calls.lock().unwrap(), 0);
        assert!(host.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_redeem_path() {
        let node: Arc<dyn BridgeNode> = Arc::new(ScriptedNode::new(vec![
            not_found(),
            pending_status(),
            broadcast_status("ltcpayout"),
        ]));
        let explorer = ScriptedExplorer::default();
        *explorer.payouts.lock().unwrap() = vec![Ok(false), Ok(true)].into();
        let host = Arc::new(ScriptedHost::with_receipts(vec![None, Some(true)]));
        let redeemer = redeemer(node, explorer, host.clone());

        let legacy_destination = encode(0xc4);
        let mut handle = redeemer.redeem(
            Decimal::from_str("0.5").unwrap(),
            &legacy_destination,
            RedeemOptions::default(),
        );

        let mut stages = Vec::new();
        while let Some(event) = handle.next_event().await {
            stages.push(event.stage());
        }
        assert_eq!(
            stages,
            vec![
                Stage::HostBroadcasted,
                Stage::HostConfirmed,
                Stage::NodeReceived,
                Stage::NodeBroadcasted,
                Stage::NativeConfirmed,
            ]
        );

        let result = handle.result().await.unwrap();
        assert_eq!(result.amount, "0.500000000000000000");
        assert_eq!(result.host_tx, TxId::from("0xburn"));
        assert_eq!(result.native_tx, TxId::from("ltcpayout"));
        assert_eq!(result.to, legacy_destination);

        let submitted = host.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].contract, "0x5979f50f1d4c08f9a53863c2f39a7b0492c38d0f");
        // the caller's string goes to the contract, not the remapped one
        assert_eq!(submitted[0].destination, legacy_destination);
    }

    #[tokio::test]
    async fn test_contract_address_cached() {
        let node = Arc::new(CountingNode {
            inner: ScriptedNode::new(vec![]),
            calls: Mutex::new(0),
        });
        let host = Arc::new(ScriptedHost::default());
        let redeemer = redeemer(node.clone(), ScriptedExplorer::default(), host);

        let selected = redeemer.selector.select().await.unwrap();
        let before = *node.calls.lock().unwrap();
        let first = redeemer.contract_address(&selected).await.unwrap();
        let second = redeemer.contract_address(&selected).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(*node.calls.lock().unwrap(), before + 1);
    }
}
