use clap::Parser;
use ptokens_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ptokens_cli::init_tracing()?;
    ptokens_cli::run(Cli::parse()).await
}
