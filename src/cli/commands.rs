//! Slash commands and the non-interactive entry points
//!
//! Agent commands (`/code`, `/plan`, `/ask`, `/search`) are not handled
//! here; they are turns and go through [`coco_core::TurnInput::parse`].

use super::{render, repl, setup};
use anyhow::{Context, Result};
use coco_core::{
    build_engine, format_error_for_cli, AgentKind, CocoConfig, Decision, FixedConfirmation,
    TurnInput, TurnOutcome, WorkflowEngine,
};
use std::path::Path;

/// Session command typed at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Index,
    Setup,
    Status,
    Clear,
    History,
    Exit,
}

/// Whether the session continues after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

struct CommandInfo {
    name: &'static str,
    description: &'static str,
    command: SlashCommand,
}

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        description: "Show this help",
        command: SlashCommand::Help,
    },
    CommandInfo {
        name: "index",
        description: "Rebuild the code index",
        command: SlashCommand::Index,
    },
    CommandInfo {
        name: "setup",
        description: "Choose models and confirmation settings for this repository",
        command: SlashCommand::Setup,
    },
    CommandInfo {
        name: "status",
        description: "Show models, cache, index and session size",
        command: SlashCommand::Status,
    },
    CommandInfo {
        name: "clear",
        description: "End this session and start a new one",
        command: SlashCommand::Clear,
    },
    CommandInfo {
        name: "history",
        description: "Show the turns in this session",
        command: SlashCommand::History,
    },
    CommandInfo {
        name: "exit",
        description: "Leave coco",
        command: SlashCommand::Exit,
    },
    CommandInfo {
        name: "quit",
        description: "Leave coco",
        command: SlashCommand::Exit,
    },
];

const AGENT_HELP: &str = "\
  /code <request>     Read and edit files, run allowed commands
  /plan <request>     Produce a step-by-step plan without changing anything
  /ask <question>     Answer questions about the code
  /search <query>     Search the web and the code index
  Anything else is routed to the best agent automatically.";

impl SlashCommand {
    /// Recognise a session command; agent commands and plain text yield `None`
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let name = line.trim().strip_prefix('/')?.split_whitespace().next()?;
        COMMANDS
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.command)
    }
}

fn help_text() -> String {
    let mut lines = vec![
        "Agents:".to_string(),
        AGENT_HELP.to_string(),
        String::new(),
        "Commands:".to_string(),
    ];
    for info in COMMANDS.iter().filter(|c| c.name != "quit") {
        lines.push(format!("  /{:<18} {}", info.name, info.description));
    }
    lines.push(
        "\nCtrl-C during a turn cancels it; nothing from a cancelled turn is recorded.".to_string(),
    );
    lines.join("\n")
}

/// Execute a session command
pub async fn handle(command: SlashCommand, engine: &mut WorkflowEngine, root: &Path) -> Result<Flow> {
    match command {
        SlashCommand::Help => println!("{}\n", help_text()),
        SlashCommand::Index => {
            println!("Rebuilding the code index...");
            match engine.rebuild_index().await {
                Ok(report) => println!(
                    "Indexed {} files into {} chunks ({} skipped).\n",
                    report.files_processed, report.chunks_created, report.files_skipped
                ),
                Err(e) => println!("{}\n", format_error_for_cli(&e)),
            }
        }
        SlashCommand::Setup => {
            let config = crate::settings::load_config(root)?;
            match setup::run(root, &config) {
                Ok(path) => println!(
                    "Saved {}. Restart coco for the new settings to take effect.\n",
                    path.display()
                ),
                Err(e) => println!("Setup not saved: {e}\n"),
            }
        }
        SlashCommand::Status => {
            let status = engine.status().await;
            let state = engine.state().get();
            println!("{}\n", render::status(&status, state.as_str()));
        }
        SlashCommand::Clear => {
            engine
                .reset()
                .await
                .context("Failed to start a new session")?;
            println!("Started a new session.\n");
        }
        SlashCommand::History => {
            println!("{}", render::history(engine.history().session()));
            println!("Log: {}\n", engine.history().log_path().display());
        }
        SlashCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

/// `coco run`: one turn, then exit
///
/// Gated calls are approved with `--yes` and denied otherwise.
pub async fn run_once(
    root: &Path,
    config: &CocoConfig,
    agent: Option<AgentKind>,
    yes: bool,
    request: &str,
) -> Result<()> {
    let provider = super::provider(config)?;
    let mut engine = build_engine(config, root, provider)
        .await
        .context("Failed to start the session")?;

    let input = match agent {
        Some(agent) => TurnInput::explicit(agent, request),
        None => TurnInput::parse(request),
    };

    let decision = if yes { Decision::Approve } else { Decision::Deny };
    let outcome =
        repl::cancellable_turn(&mut engine, input, &FixedConfirmation(decision)).await;

    if let Err(e) = engine.close().await {
        tracing::warn!(error = %e, "Failed to record session end");
    }

    match outcome {
        TurnOutcome::Failed { reason, hint } => {
            if let Some(hint) = hint {
                eprintln!("hint: {hint}");
            }
            anyhow::bail!(reason)
        }
        TurnOutcome::Aborted => anyhow::bail!("Turn cancelled"),
        completed => {
            println!("{}", render::outcome(&completed));
            Ok(())
        }
    }
}

/// `coco index`: rebuild the code index without starting a session
pub async fn rebuild_index(root: &Path, config: &CocoConfig) -> Result<()> {
    let index = coco_core::workflow::open_index(config, root)
        .await
        .context("The code index could not be opened; see the log for details")?;

    println!("Indexing {}...", root.display());
    let report = index.rebuild().await.context("Index rebuild failed")?;
    println!(
        "Indexed {} files into {} chunks ({} skipped).",
        report.files_processed, report.chunks_created, report.files_skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_commands_parse() {
        assert_eq!(SlashCommand::parse("/help"), Some(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("  /STATUS "), Some(SlashCommand::Status));
        assert_eq!(SlashCommand::parse("/quit"), Some(SlashCommand::Exit));
        assert_eq!(SlashCommand::parse("/history now"), Some(SlashCommand::History));
    }

    #[test]
    fn test_agent_commands_and_text_are_not_session_commands() {
        assert_eq!(SlashCommand::parse("/code fix the parser"), None);
        assert_eq!(SlashCommand::parse("/plan"), None);
        assert_eq!(SlashCommand::parse("what does main.py do?"), None);
        assert_eq!(SlashCommand::parse("/"), None);
    }

    #[test]
    fn test_help_lists_agents_and_commands() {
        let help = help_text();
        for needle in [
            "/code", "/plan", "/ask", "/search", "/index", "/setup", "/status", "/clear",
            "/history", "/exit",
        ] {
            assert!(help.contains(needle), "help is missing {needle}");
        }
        assert!(!help.contains("/quit"));
    }
}
