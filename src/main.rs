//! coco - terminal coding assistant
//!
//! Starts the interactive session by default; `coco run` answers one request
//! and `coco index` rebuilds the code index.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod logging;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let _log_guard = logging::init(cli.verbose)?;

    cli::run(cli).await
}
