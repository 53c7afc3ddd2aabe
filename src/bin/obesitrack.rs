//! obesitrack binary entry point

use clap::Parser;
use obesitrack::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Cli::parse().run().await
}
