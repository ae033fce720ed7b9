//! Interactive session loop

use super::commands::{self, Flow, SlashCommand};
use super::confirm::TerminalConfirmation;
use super::prompts::{self, Line};
use super::render;
use anyhow::{Context, Result};
use coco_core::{build_engine, CocoConfig, ConfirmationChannel, TurnInput, TurnOutcome, WorkflowEngine};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PROMPT: &str = "coco>";

/// Run the interactive session until `/exit` or end of input
pub async fn run(root: &Path, config: &CocoConfig) -> Result<()> {
    let provider = super::provider(config)?;
    let mut engine = build_engine(config, root, provider)
        .await
        .context("Failed to start the session")?;

    info!(root = %root.display(), session_id = %engine.history().session().id(), "Session started");
    println!(
        "coco {} in {}\nType a request, /help for commands, /exit to quit.",
        env!("CARGO_PKG_VERSION"),
        root.display()
    );
    if engine.index().is_none() {
        println!("The code index is not available; answers will not include code context.");
    }

    let confirm = TerminalConfirmation;
    loop {
        let line = tokio::task::spawn_blocking(|| prompts::request_line(PROMPT))
            .await
            .context("Input task failed")??;
        let line = match line {
            Line::Input(line) => line,
            Line::Cancelled => continue,
            Line::Exit => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = SlashCommand::parse(line) {
            match commands::handle(command, &mut engine, root).await? {
                Flow::Continue => continue,
                Flow::Exit => break,
            }
        }

        let outcome = cancellable_turn(&mut engine, TurnInput::parse(line), &confirm).await;
        println!("{}\n", render::outcome(&outcome));
    }

    if let Err(e) = engine.close().await {
        warn!(error = %e, "Failed to record session end");
    }
    println!("Bye.");
    Ok(())
}

/// Run one turn with Ctrl-C bound to its cancellation token
pub async fn cancellable_turn(
    engine: &mut WorkflowEngine,
    input: TurnInput,
    confirm: &dyn ConfirmationChannel,
) -> TurnOutcome {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = engine.handle_turn(input, cancel, confirm).await;
    watcher.abort();
    outcome
}
