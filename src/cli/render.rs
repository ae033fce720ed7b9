//! Plain-text rendering of turn outcomes and session state

use coco_core::{EngineStatus, Session, TurnOutcome};
use std::fmt::Write;

const HISTORY_PREVIEW_CHARS: usize = 120;

/// Text printed after a turn
#[must_use]
pub fn outcome(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Completed(report) => {
            let result = &report.result;
            let mut out = format!("[{}]", report.route.agent);
            if !report.route.explicit {
                let _ = write!(out, " (routed, {} tier)", report.route.tier);
            }
            out.push('\n');

            if let Some(question) = &result.clarification {
                let _ = writeln!(out, "? {question}");
            } else {
                let _ = writeln!(out, "{}", result.text.trim_end());
            }

            if let Some(plan) = &result.plan {
                let _ = writeln!(out, "\nPlan: {} step(s)", plan.steps.len());
            }

            let executed = result.executed_trace().count();
            let denied = result.denied().count();
            if executed + denied > 0 {
                let _ = writeln!(out, "\nTools: {executed} ran, {denied} declined");
            }

            if let Some(compression) = &report.compression {
                if let coco_core::CompressionOutcome::Compressed { folded, before, after } =
                    compression
                {
                    let _ = writeln!(
                        out,
                        "(Summarized {folded} older turns: {before} -> {after} tokens)"
                    );
                }
            }
            out.trim_end().to_string()
        }
        TurnOutcome::Aborted => "Turn cancelled. Nothing was recorded.".to_string(),
        TurnOutcome::Failed { reason, hint } => match hint {
            Some(hint) => format!("error: {reason}\n  hint: {hint}"),
            None => format!("error: {reason}"),
        },
    }
}

/// `/status` output
#[must_use]
pub fn status(status: &EngineStatus, state: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "State:    {state}");
    let _ = writeln!(
        out,
        "Models:   {} (complex), {} (simple) via {}",
        status.complex_model, status.simple_model, status.provider
    );
    let _ = writeln!(
        out,
        "Cache:    {} with {} entries, {} hits / {} misses",
        status.cache_backend, status.cache_entries, status.cache_stats.hits, status.cache_stats.misses
    );
    match &status.index {
        Ok(stats) => {
            let _ = writeln!(
                out,
                "Index:    {} files, {} chunks ({}, updated {})",
                stats.files,
                stats.chunks,
                stats.backend,
                stats.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
        Err(reason) => {
            let _ = writeln!(out, "Index:    unavailable ({reason})");
        }
    }
    let _ = write!(
        out,
        "Session:  {} turns, {} tokens, {} summarized",
        status.session_turns, status.session_tokens, status.summarized_turns
    );
    out
}

/// `/history` output
#[must_use]
pub fn history(session: &Session) -> String {
    let mut out = String::new();
    if let Some(summary) = session.summary() {
        let _ = writeln!(
            out,
            "Summary of {} earlier turns:\n  {}\n",
            summary.covers_turns, summary.content
        );
    }
    if session.turns().is_empty() {
        out.push_str("No turns yet.");
        return out;
    }
    for (i, turn) in session.turns().iter().enumerate() {
        let line = turn.transcript_line().replace('\n', " ");
        let clipped: String = line.chars().take(HISTORY_PREVIEW_CHARS).collect();
        let ellipsis = if clipped.len() < line.len() { "..." } else { "" };
        let _ = writeln!(out, "{:>3}. {clipped}{ellipsis}", i + 1);
    }
    out.trim_end().to_string()
}
