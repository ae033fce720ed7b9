//! Terminal confirmation
//!
//! Shows what a gated tool call would do and blocks on a yes/no answer.
//! Cancelling the prompt aborts the turn instead of denying the call.

use super::prompts;
use coco_core::{ConfirmationChannel, Decision, Error, PendingToolCall};

const PREVIEW_LINES: usize = 20;

/// Asks the operator on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmation;

#[async_trait::async_trait]
impl ConfirmationChannel for TerminalConfirmation {
    async fn present(&self, call: &PendingToolCall) -> coco_core::Result<Decision> {
        let call = call.clone();
        let answer = tokio::task::spawn_blocking(move || {
            println!();
            println!("  {} wants to {}", call.agent, call.describe());
            if let Some(preview) = preview(&call) {
                println!("{preview}");
            }
            prompts::approve(
                &format!("Allow this {}-risk action?", call.risk.as_str()),
                Some("Answer y or n. Nothing is changed unless you answer yes"),
            )
        })
        .await
        .map_err(|e| Error::Internal(format!("confirmation prompt failed: {e}")))?;

        match answer {
            Ok(true) => Ok(Decision::Approve),
            Ok(false) => Ok(Decision::Deny),
            Err(e) => Err(Error::Aborted(e.to_string())),
        }
    }
}

/// Body shown under the one-line description
fn preview(call: &PendingToolCall) -> Option<String> {
    let field = |key: &str| call.arguments.get(key).and_then(|v| v.as_str());
    let body = match call.name.as_str() {
        "write_file" => field("content")?,
        "run_command" => field("command")?,
        _ => return None,
    };

    let lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<String> = lines
        .iter()
        .take(PREVIEW_LINES)
        .map(|l| format!("    | {l}"))
        .collect();
    if lines.len() > PREVIEW_LINES {
        out.push(format!("    | ... {} more lines", lines.len() - PREVIEW_LINES));
    }
    Some(out.join("\n"))
}
