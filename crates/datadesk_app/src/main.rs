mod cli;
mod config;
mod platform;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    platform::logging::initialize(cli.global.log, cli.global.verbose);
    platform::app::run(cli).await
}
