// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]

//! Solidafy Pager CLI
//!
//! Command-line interface for paginating HTTP APIs

use anyhow::Context;
use clap::Parser;
use solidafy_pager::cli::{Cli, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the JSON lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.tracing_level().into()),
        )
        .init();

    let runner = Runner::new(cli);
    runner.run().await.context("solidafy-pager failed")
}
