//! CLI entry point for the review trend analyzer.

use anyhow::Result;

mod app;
mod cli;
mod output;

#[tokio::main]
async fn main() -> Result<()> {
    app::runtime::run_analysis().await
}
