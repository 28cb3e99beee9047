//! Command handlers

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use bridge_node_client::{NodeClient, ReportFilter, ReportSide};
use pbtc::PBtc;
use pltc::PLtc;
use ptokens_core::{ClientConfig, PToken};
use ptokens_transfer::{PTokenClient, RedeemOptions, TransferHandle};

use crate::Command;

/// The pToken client matching the configured token
pub enum Bridge {
    Btc(PBtc),
    Ltc(PLtc),
}

impl Bridge {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(match config.ptoken {
            PToken::Pbtc => Self::Btc(PBtc::new(config)?),
            PToken::Pltc => Self::Ltc(PLtc::new(config)?),
        })
    }

    pub fn client(&self) -> &PTokenClient {
        match self {
            Self::Btc(pbtc) => pbtc.client(),
            Self::Ltc(pltc) => pltc.client(),
        }
    }
}

pub async fn execute(config: &ClientConfig, command: Command) -> Result<()> {
    let bridge = Bridge::connect(config)?;

    match command {
        Command::Info => info(&bridge).await,
        Command::Reports { side, by, limit } => reports(&bridge, side, by, limit).await,
        Command::Report { tx_hash, broadcast } => report(&bridge, &tx_hash, broadcast).await,
        Command::DepositAddress {
            host_address,
            watch,
            max_wait,
        } => {
            let max_wait = max_wait.map(Duration::from_secs);
            deposit_address(&bridge, &host_address, watch, max_wait).await
        }
        Command::Redeem {
            amount,
            destination,
            gas,
            gas_price,
            max_wait,
        } => {
            let options = RedeemOptions {
                gas,
                gas_price,
                max_wait: max_wait.map(Duration::from_secs),
            };
            let handle = match &bridge {
                Bridge::Btc(pbtc) => pbtc.redeem(amount, &destination, options),
                Bridge::Ltc(pltc) => pltc.redeem(amount, &destination, options),
            };
            follow(handle).await
        }
    }
}

async fn info(bridge: &Bridge) -> Result<()> {
    let client = bridge.client();
    let node = client.select_node().await?;
    let contract = client.contract_address().await?;
    print_json(&json!({
        "endpoint": node.endpoint(),
        "info": node.info,
        "contract": contract,
    }))
}

async fn node_client(bridge: &Bridge) -> Result<NodeClient> {
    let node = bridge.client().select_node().await?;
    Ok(NodeClient::new(node.endpoint())?)
}

async fn reports(
    bridge: &Bridge,
    side: ReportSide,
    filter: Option<ReportFilter>,
    limit: u32,
) -> Result<()> {
    let node = node_client(bridge).await?;
    let reports = match filter {
        Some(filter) => node.get_reports_by(&filter, limit).await?,
        None => node.get_reports(side, limit).await?,
    };
    print_json(&reports)
}

async fn report(bridge: &Bridge, tx_hash: &str, broadcast: bool) -> Result<()> {
    let node = node_client(bridge).await?;
    let report = if broadcast {
        node.get_report_by_broadcast_tx_hash(tx_hash).await?
    } else {
        node.get_report_by_incoming_tx_hash(tx_hash).await?
    };
    print_json(&report)
}

async fn deposit_address(
    bridge: &Bridge,
    host_address: &str,
    watch: bool,
    max_wait: Option<Duration>,
) -> Result<()> {
    let client = bridge.client();
    let deposit = client.get_deposit_address(host_address).await?;
    print_json(&json!({
        "depositAddress": deposit.as_str(),
        "hostAddress": deposit.host_address(),
        "nonce": deposit.nonce(),
        "nodePublicKey": deposit.node_public_key(),
        "verified": deposit.verify(),
    }))?;

    if watch {
        follow(client.wait_for_deposit(&deposit, max_wait)).await?;
    }
    Ok(())
}

/// Log progress events until the transfer ends, then print its result
async fn follow<T>(mut handle: TransferHandle<T>) -> Result<()>
where
    T: Serialize + Clone + Send + 'static,
{
    tracing::info!(transfer = %handle.id(), direction = ?handle.direction(), "Following transfer");
    while let Some(event) = handle.next_event().await {
        tracing::info!(
            stage = %event.stage(),
            tx = %event.tx_id(),
            event = event.event_names()[0],
            "Transfer progress"
        );
    }
    let result = handle.result().await?;
    print_json(&result)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
