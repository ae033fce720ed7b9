//! Logging setup
//!
//! Everything goes to a daily file under `~/.coco/logs` so the terminal stays
//! readable. `--verbose` also mirrors warnings and errors to stderr.

use anyhow::{Context, Result};
use coco_core::coco_home;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "coco=info,coco_core=info,coco_tools=info,coco_llm=info,coco_index=info";

/// Install the global subscriber; keep the guard alive until exit
pub fn init(verbose: bool) -> Result<WorkerGuard> {
    let dir = coco_home().join("logs");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "coco.log"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        );

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(guard)
}
