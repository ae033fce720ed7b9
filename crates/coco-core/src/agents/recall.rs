//! Keyword recall over the active session

use crate::history::Session;
use std::collections::BTreeSet;

/// Longest excerpt shown per matching turn
const EXCERPT_CHARS: usize = 400;

/// Turns returned when the caller does not say
pub const DEFAULT_RECALL_LIMIT: usize = 5;

/// Search the session's turns and summary for `query`
///
/// Turns are ranked by the number of distinct query terms they contain,
/// newer turns first on ties.
#[must_use]
pub fn recall(session: &Session, query: &str, limit: usize) -> String {
    let terms = terms(query);
    if terms.is_empty() {
        return "Error: recall_history needs a query with at least one word".to_string();
    }

    let mut hits: Vec<(usize, usize)> = session
        .turns()
        .iter()
        .enumerate()
        .filter_map(|(i, turn)| {
            let content = turn.content.to_lowercase();
            let score = terms.iter().filter(|t| content.contains(t.as_str())).count();
            (score > 0).then_some((score, i))
        })
        .collect();
    hits.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    hits.truncate(limit.max(1));

    let mut out = Vec::new();
    if let Some(summary) = session.summary() {
        let content = summary.content.to_lowercase();
        if terms.iter().any(|t| content.contains(t.as_str())) {
            out.push(format!("Earlier (summarized): {}", clip(&summary.content)));
        }
    }
    for (_, i) in hits {
        out.push(format!("#{} {}", i + 1, clip(&session.turns()[i].transcript_line())));
    }

    if out.is_empty() {
        format!("No earlier turns mention \"{}\".", query.trim())
    } else {
        out.join("\n")
    }
}

fn terms(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '.' && c != '/')
        .map(|t| t.trim_matches('.').to_lowercase())
        .filter(|t| t.chars().count() >= 3)
        .collect()
}

fn clip(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}
