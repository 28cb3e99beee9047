//! ptokens command-line client
//!
//! Connection settings come from a JSON config file (`--config`), flags, or
//! both; flags override the file.

pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use bridge_node_client::{ReportFilter, ReportSide};
use ptokens_core::{Blockchain, ClientConfig, Network, PToken};

#[derive(Parser, Debug)]
#[command(name = "ptokens", version, about = "pTokens bridge client (pBTC, pLTC)")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// JSON configuration file
    #[arg(long, short, global = true)]
    pub config: Option<String>,

    /// pbtc or pltc
    #[arg(long, global = true)]
    pub ptoken: Option<PToken>,

    /// Host blockchain (ethereum, eosio)
    #[arg(long = "host", global = true)]
    pub host_blockchain: Option<Blockchain>,

    #[arg(long, global = true, value_parser = parse_network)]
    pub network: Option<Network>,

    /// Bridge node endpoint, repeat for several candidates
    #[arg(long = "node", global = true)]
    pub nodes: Vec<String>,

    #[arg(long, global = true)]
    pub explorer_url: Option<String>,

    /// Host chain JSON-RPC URL
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Host account submitting redeems
    #[arg(long, global = true)]
    pub account: Option<String>,
}

impl ConnectionArgs {
    /// Resolve the effective client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(ptoken) = self.ptoken {
            config.ptoken = ptoken;
        }
        if let Some(host) = self.host_blockchain {
            config.host_blockchain = host;
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if !self.nodes.is_empty() {
            config.nodes = self.nodes.clone();
        }
        if let Some(url) = &self.explorer_url {
            config.explorer_url = Some(url.clone());
        }
        if let Some(url) = &self.rpc_url {
            config.host.rpc_url = url.clone();
        }
        if let Some(account) = &self.account {
            config.host.account = Some(account.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select a bridge node and show its info
    Info,

    /// Latest reports of the selected node
    Reports {
        /// host or native
        #[arg(long, default_value = "host", value_parser = parse_side)]
        side: ReportSide,

        /// Filter by address instead of side: sender=, recipient=,
        /// native_address= or host_address=
        #[arg(long, value_parser = parse_filter, conflicts_with = "side")]
        by: Option<ReportFilter>,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Report for one transaction
    Report {
        tx_hash: String,

        /// `tx_hash` is a transaction the node broadcast rather than one it received
        #[arg(long)]
        broadcast: bool,
    },

    /// Request and verify a deposit address for a host address
    DepositAddress {
        host_address: String,

        /// Follow the issue until the pTokens are minted
        #[arg(long)]
        watch: bool,

        /// Give up watching after this many seconds
        #[arg(long, requires = "watch")]
        max_wait: Option<u64>,
    },

    /// Burn pTokens and wait for the native payout
    Redeem {
        amount: Decimal,

        /// Native chain destination address
        destination: String,

        #[arg(long)]
        gas: Option<u64>,

        /// Gas price in wei
        #[arg(long)]
        gas_price: Option<u128>,

        /// Give up after this many seconds
        #[arg(long)]
        max_wait: Option<u64>,
    },
}

fn parse_network(value: &str) -> Result<Network, String> {
    Network::from_identifier(value).ok_or_else(|| format!("unknown network: {}", value))
}

fn parse_side(value: &str) -> Result<ReportSide, String> {
    match value.to_ascii_lowercase().as_str() {
        "host" => Ok(ReportSide::Host),
        "native" => Ok(ReportSide::Native),
        other => Err(format!("unknown report side: {}", other)),
    }
}

fn parse_filter(value: &str) -> Result<ReportFilter, String> {
    let (key, address) = value
        .split_once('=')
        .ok_or_else(|| format!("expected <field>=<address>, got {}", value))?;
    let address = address.to_string();
    match key {
        "sender" => Ok(ReportFilter::Sender(address)),
        "recipient" => Ok(ReportFilter::Recipient(address)),
        "native_address" => Ok(ReportFilter::NativeAddress(address)),
        "host_address" => Ok(ReportFilter::HostAddress(address)),
        other => Err(format!("unknown report filter: {}", other)),
    }
}

/// Log to stderr, keeping stdout for command output
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ptokens_transfer=debug".parse()?)
                .add_directive("bridge_node_client=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.connection.client_config()?;
    tracing::info!(
        ptoken = %config.ptoken,
        host = %config.host_blockchain,
        network = %config.network,
        "Starting ptokens"
    );
    commands::execute(&config, cli.command).await
}
