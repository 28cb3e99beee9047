//! `PTokenClient`: one pToken on one host chain, composed from the node
//! selector, the deposit engine, the monitor and the redeemer

use std::sync::Arc;
use std::time::Duration;

use bridge_node_client::{NodeSelector, SelectedNode};
use host_chain::{host_decimals, EosRpcClient, EthRpcClient, HostChain, RedeemOptions};
use native_chain::{EsploraClient, NativeExplorer, NativeParams};
use ptokens_core::{
    Blockchain, ClientConfig, Error, MonitorConfig, PTokenConfig, TransferError,
};
use rust_decimal::Decimal;

use crate::deposit::{DepositAddress, DepositEngine};
use crate::events::Direction;
use crate::handle::TransferHandle;
use crate::monitor::{IssueResult, Monitor};
use crate::redeem::{RedeemResult, RedeemRules, Redeemer};

pub struct PTokenClient {
    config: PTokenConfig,
    native_params: NativeParams,
    selector: Arc<NodeSelector>,
    monitor: Monitor,
    deposits: DepositEngine,
    redeemer: Redeemer,
}

impl PTokenClient {
    pub fn new(
        config: PTokenConfig,
        selector: NodeSelector,
        explorer: Arc<dyn NativeExplorer>,
        host: Arc<dyn HostChain>,
        monitor_config: MonitorConfig,
        redeem_minimum: Decimal,
    ) -> Result<Self, Error> {
        let pairing = config.pairing;
        let native_params =
            NativeParams::for_chain(pairing.native_blockchain, pairing.native_network).ok_or_else(
                || Error::Config(format!("{} is not a native blockchain", pairing.native_blockchain)),
            )?;

        let selector = Arc::new(selector);
        let monitor = Monitor::new(explorer, host, monitor_config);
        let rules = RedeemRules {
            symbol: config.ptoken.symbol().to_string(),
            minimum: redeem_minimum,
            native_params,
            host_decimals: host_decimals(pairing.host_blockchain),
        };

        Ok(Self {
            deposits: DepositEngine::new(pairing.host_blockchain, native_params),
            redeemer: Redeemer::new(Arc::clone(&selector), monitor.clone(), rules),
            config,
            native_params,
            selector,
            monitor,
        })
    }

    /// Build HTTP-backed collaborators from a loaded configuration
    pub fn from_client_config(config: &ClientConfig, redeem_minimum: Decimal) -> Result<Self, Error> {
        config.validate()?;
        let ptoken_config = config.ptoken_config();
        let pairing = ptoken_config.pairing;

        let native_params =
            NativeParams::for_chain(pairing.native_blockchain, pairing.native_network).ok_or_else(
                || Error::Config(format!("{} is not a native blockchain", pairing.native_blockchain)),
            )?;

        let selector = NodeSelector::from_config(&ptoken_config, config.monitor.probe_timeout())?;

        let explorer_url = config
            .explorer_url
            .clone()
            .unwrap_or_else(|| native_params.default_explorer_url.to_string());
        let explorer: Arc<dyn NativeExplorer> = Arc::new(EsploraClient::new(explorer_url)?);

        let host: Arc<dyn HostChain> = match pairing.host_blockchain {
            Blockchain::Ethereum => Arc::new(EthRpcClient::new(
                config.host.rpc_url.clone(),
                config.host.account.clone(),
            )?),
            Blockchain::Eosio => Arc::new(EosRpcClient::new(
                config.host.rpc_url.clone(),
                config.host.signer_url.clone(),
                config.host.account.clone(),
                ptoken_config.ptoken.symbol(),
            )?),
            other => {
                return Err(Error::Config(format!(
                    "no RPC client available for host blockchain {}",
                    other
                )))
            }
        };

        tracing::info!(
            ptoken = %ptoken_config.ptoken,
            pairing = %pairing,
            nodes = ptoken_config.candidate_endpoints().len(),
            "pToken client configured"
        );

        Self::new(
            ptoken_config,
            selector,
            explorer,
            host,
            config.monitor.clone(),
            redeem_minimum,
        )
    }

    pub fn config(&self) -> &PTokenConfig {
        &self.config
    }

    pub fn native_params(&self) -> &NativeParams {
        &self.native_params
    }

    pub fn selector(&self) -> &NodeSelector {
        &self.selector
    }

    pub fn redeem_rules(&self) -> &RedeemRules {
        self.redeemer.rules()
    }

    /// Probe the candidates and cache a node for this pairing
    pub async fn select_node(&self) -> Result<SelectedNode, TransferError> {
        self.selector.select().await
    }

    /// Request and verify a deposit address for `host_address`
    pub async fn get_deposit_address(
        &self,
        host_address: &str,
    ) -> Result<DepositAddress, TransferError> {
        let node = self.selector.selected_or_select().await?;
        self.deposits.generate(&node, host_address).await
    }

    /// Follow a deposit address through the whole issue.
    ///
    /// The address is re-derived first; a mismatch rejects the handle. Without
    /// `max_wait` the configured bound applies.
    pub fn wait_for_deposit(
        &self,
        deposit: &DepositAddress,
        max_wait: Option<Duration>,
    ) -> TransferHandle<IssueResult> {
        if let Err(e) = deposit.ensure_verified() {
            tracing::error!(address = %deposit, error = %e, "Refusing to watch unverified deposit address");
            return TransferHandle::rejected(Direction::Issue, e);
        }

        self.monitor.watch_issue(
            Arc::clone(&self.selector),
            deposit.as_str().to_string(),
            max_wait.or_else(|| self.monitor.config().max_wait()),
        )
    }

    /// Burn pTokens and follow the native payout
    pub fn redeem(
        &self,
        amount: Decimal,
        destination: &str,
        options: RedeemOptions,
    ) -> TransferHandle<RedeemResult> {
        self.redeemer.redeem(amount, destination, options)
    }

    /// pToken contract on the host chain
    pub async fn contract_address(&self) -> Result<String, TransferError> {
        let node = self.selector.selected_or_select().await?;
        self.redeemer.contract_address(&node).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Stage;
    use crate::monitor::tests::{
        broadcast_status, fast_config, ScriptedExplorer, ScriptedHost, ScriptedNode,
    };
    use bridge_node_client::{BridgeNode, DepositAddressResponse};
    use host_chain::host_address_bytes;
    use native_chain::derive_deposit_address;
    use ptokens_core::{Network, PToken};
    use std::str::FromStr;
    use std::time::Duration;

    const ETH: &str = "0xfedfe2616eb3661cb8fed2782f5f0cc91d59dcac";

    fn client(node: ScriptedNode, explorer: ScriptedExplorer, host: ScriptedHost) -> PTokenClient {
        let config = PTokenConfig::new(PToken::Pltc, Blockchain::Ethereum, Network::Testnet)
            .with_nodes(vec!["https://scripted-node".into()]);
        let candidates: Vec<Arc<dyn BridgeNode>> = vec![Arc::new(node)];
        let selector = NodeSelector::new(config.pairing, candidates, Duration::from_secs(4));

        PTokenClient::new(
            config,
            selector,
            Arc::new(explorer),
            Arc::new(host),
            fast_config(),
            Decimal::from_str("0.00005").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_from_deposit_address_to_mint() {
        let node = ScriptedNode::new(vec![broadcast_status("0xmint")]);
        let params = NativeParams::for_chain(Blockchain::Litecoin, Network::Testnet).unwrap();
        let host_bytes = host_address_bytes(Blockchain::Ethereum, ETH).unwrap();
        let address =
            derive_deposit_address(&host_bytes, 9, &node.info.public_key, &params).unwrap();
        *node.deposit.lock().unwrap() = Some(DepositAddressResponse {
            nonce: 9,
            native_deposit_address: address.clone(),
            enclave_public_key: node.info.public_key.clone(),
        });

        let explorer = ScriptedExplorer::with_snapshots(vec![(vec![], vec![("9d5c", true)])]);
        let client = client(node, explorer, ScriptedHost::with_receipts(vec![Some(true)]));

        let deposit = client.get_deposit_address(ETH).await.unwrap();
        assert_eq!(deposit.as_str(), address);
        assert!(address.starts_with('Q'));

        let mut handle = client.wait_for_deposit(&deposit, None);
        let mut last = None;
        while let Some(event) = handle.next_event().await {
            last = Some(event.stage());
        }
        assert_eq!(last, Some(Stage::HostConfirmed));
        assert_eq!(handle.result().await.unwrap().host_tx.as_str(), "0xmint");
    }

    #[tokio::test]
    async fn test_contract_address_from_node() {
        let client = client(
            ScriptedNode::new(vec![]),
            ScriptedExplorer::default(),
            ScriptedHost::default(),
        );
        assert_eq!(
            client.contract_address().await.unwrap(),
            "0x5979f50f1d4c08f9a53863c2f39a7b0492c38d0f"
        );
        assert_eq!(client.redeem_rules().host_decimals, 18);
        assert_eq!(client.redeem_rules().symbol, "pLTC");
    }

    #[test]
    fn test_from_client_config_builds_eos_host() {
        let config = ClientConfig {
            ptoken: PToken::Pbtc,
            host_blockchain: Blockchain::Eosio,
            nodes: vec!["https://pbtconeos-node-1a.ngrok.io".into()],
            ..ClientConfig::default()
        };
        let client = PTokenClient::from_client_config(&config, Decimal::ONE).unwrap();
        assert_eq!(client.monitor.host().blockchain(), Blockchain::Eosio);
        assert_eq!(client.redeem_rules().host_decimals, 8);
    }

    #[test]
    fn test_from_client_config_rejects_utxo_host() {
        let config = ClientConfig {
            ptoken: PToken::Pbtc,
            host_blockchain: Blockchain::Litecoin,
            nodes: vec!["https://pbtconeth-node-1a.ngrok.io".into()],
            ..ClientConfig::default()
        };
        let err = PTokenClient::from_client_config(&config, Decimal::ONE)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_wait_for_deposit_rejects_unverified_address() {
        let node = ScriptedNode::new(vec![broadcast_status("0xmint")]);
        let public_key = node.info.public_key.clone();
        let params = NativeParams::for_chain(Blockchain::Litecoin, Network::Testnet).unwrap();
        let client = client(node, ScriptedExplorer::default(), ScriptedHost::default());

        // built directly, never checked against the derivation
        let forged = DepositAddress::new(
            Blockchain::Ethereum,
            ETH,
            9,
            public_key,
            params,
            "QNotTheDerivedAddressAtAll1111111",
        );
        let mut handle = client.wait_for_deposit(&forged, Some(Duration::from_secs(60)));

        assert!(handle.status().is_terminal());
        let err = handle.result().await.unwrap_err();
        assert_eq!(err.error_code(), "address_mismatch");
        assert!(handle.next_event().await.is_none());
    }

    #[test]
    fn test_from_client_config_builds_http_client() {
        let config = ClientConfig {
            ptoken: PToken::Pbtc,
            nodes: vec!["https://pbtconeth-node-1a.ngrok.io".into()],
            ..ClientConfig::default()
        };
        let client = PTokenClient::from_client_config(&config, Decimal::ONE).unwrap();
        assert_eq!(client.native_params().p2sh_version, 0x05);
        assert_eq!(client.config().candidate_endpoints().len(), 1);
    }
}
