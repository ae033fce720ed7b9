//! Text tool-call protocol
//!
//! The model requests tools with
//!
//! ```text
//! <tool_call>
//! {"name": "read_file", "arguments": {"path": "src/main.rs"}}
//! </tool_call>
//! ```
//!
//! and receives observations as `<tool_result name="...">` blocks. A reply
//! without any block is final. A final reply may carry a
//! `[CLARIFY]question[/CLARIFY]` block.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TOOL_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_call>\s*(.*?)\s*</tool_call>").expect("tool call regex")
});

static CLARIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[CLARIFY\](.*?)(?:\[/CLARIFY\]|\z)").expect("clarify regex")
});

const OPEN_TAG: &str = "<tool_call>";

/// A well-formed tool request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedCall {
    /// Tool name
    pub name: String,
    /// Arguments object
    pub arguments: Value,
}

/// A model reply split into prose and tool requests
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// Reply text with every tool block removed
    pub text: String,
    /// Requests in order; malformed blocks carry the parse error
    pub calls: Vec<Result<RequestedCall, String>>,
}

impl ParsedReply {
    /// Whether the model asked for no tools
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Split a reply into text and tool requests
#[must_use]
pub fn parse_reply(reply: &str) -> ParsedReply {
    let mut calls: Vec<Result<RequestedCall, String>> = TOOL_CALL_RE
        .captures_iter(reply)
        .map(|cap| parse_call(cap.get(1).map_or("", |m| m.as_str())))
        .collect();

    let stripped = TOOL_CALL_RE.replace_all(reply, "");
    let text = match stripped.find(OPEN_TAG) {
        Some(pos) => {
            calls.push(Err("unterminated <tool_call> block".to_string()));
            stripped[..pos].to_string()
        }
        None => stripped.into_owned(),
    };

    ParsedReply {
        text: text.trim().to_string(),
        calls,
    }
}

fn parse_call(body: &str) -> Result<RequestedCall, String> {
    let body = body
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("tool call is not valid JSON: {e}"))?;

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| "tool call has no \"name\"".to_string())?
        .trim()
        .to_string();

    let arguments = match value.get("arguments") {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        // some models double-encode the arguments object
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| format!("arguments for '{name}' are not a JSON object: {e}"))?,
        Some(other) => other.clone(),
    };
    if !arguments.is_object() {
        return Err(format!("arguments for '{name}' must be a JSON object"));
    }

    Ok(RequestedCall { name, arguments })
}

/// Render observations as the next user message
#[must_use]
pub fn render_observations(observations: &[(String, String)]) -> String {
    observations
        .iter()
        .map(|(name, text)| format!("<tool_result name=\"{name}\">\n{}\n</tool_result>", text.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Remove a clarification block, returning the remaining text and the
/// question
#[must_use]
pub fn extract_clarification(text: &str) -> (String, Option<String>) {
    let Some(cap) = CLARIFY_RE.captures(text) else {
        return (text.to_string(), None);
    };
    let question = cap
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| !q.is_empty());
    let rest = CLARIFY_RE.replace(text, "").trim().to_string();
    (rest, question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_reply_has_no_calls() {
        let parsed = parse_reply("  main.py parses arguments and starts the server.\n");
        assert!(parsed.is_final());
        assert_eq!(parsed.text, "main.py parses arguments and starts the server.");
    }

    #[test]
    fn test_parses_calls_in_order() {
        let reply = r#"Let me look first.
<tool_call>
{"name": "read_file", "arguments": {"path": "src/parser.py"}}
</tool_call>
<tool_call>{"name": "list_directory"}</tool_call>"#;
        let parsed = parse_reply(reply);

        assert_eq!(parsed.text, "Let me look first.");
        assert_eq!(parsed.calls.len(), 2);
        let first = parsed.calls[0].as_ref().unwrap();
        assert_eq!(first.name, "read_file");
        assert_eq!(first.arguments["path"], "src/parser.py");
        let second = parsed.calls[1].as_ref().unwrap();
        assert_eq!(second.name, "list_directory");
        assert_eq!(second.arguments, serde_json::json!({}));
    }

    #[test]
    fn test_fenced_and_double_encoded_arguments() {
        let reply = "<tool_call>\n```json\n{\"name\": \"git_log\", \"arguments\": \"{\\\"limit\\\": 3}\"}\n```\n</tool_call>";
        let call = parse_reply(reply).calls.remove(0).unwrap();
        assert_eq!(call.name, "git_log");
        assert_eq!(call.arguments["limit"], 3);
    }

    #[test]
    fn test_malformed_blocks_are_reported() {
        let parsed = parse_reply(
            "<tool_call>{not json}</tool_call><tool_call>{\"arguments\": {}}</tool_call>\
             <tool_call>{\"name\": \"x\", \"arguments\": [1]}</tool_call>",
        );
        assert_eq!(parsed.calls.len(), 3);
        assert!(parsed.calls[0].as_ref().unwrap_err().contains("not valid JSON"));
        assert!(parsed.calls[1].as_ref().unwrap_err().contains("no \"name\""));
        assert!(parsed.calls[2].as_ref().unwrap_err().contains("must be a JSON object"));
    }

    #[test]
    fn test_unterminated_block() {
        let parsed = parse_reply("Working.\n<tool_call>{\"name\": \"read_file\"");
        assert_eq!(parsed.text, "Working.");
        assert_eq!(parsed.calls.len(), 1);
        assert!(parsed.calls[0].as_ref().unwrap_err().contains("unterminated"));
    }

    #[test]
    fn test_render_observations() {
        let text = render_observations(&[
            ("read_file".to_string(), "line one\n".to_string()),
            ("write_file".to_string(), "[DENIED] no".to_string()),
        ]);
        assert_eq!(
            text,
            "<tool_result name=\"read_file\">\nline one\n</tool_result>\n\n\
             <tool_result name=\"write_file\">\n[DENIED] no\n</tool_result>"
        );
    }

    #[test]
    fn test_clarification() {
        let (rest, question) =
            extract_clarification("I need one detail.\n[CLARIFY]Which parse() do you mean?[/CLARIFY]");
        assert_eq!(rest, "I need one detail.");
        assert_eq!(question.as_deref(), Some("Which parse() do you mean?"));

        let (rest, question) = extract_clarification("[CLARIFY] Python or Rust?");
        assert_eq!(rest, "");
        assert_eq!(question.as_deref(), Some("Python or Rust?"));

        let (rest, question) = extract_clarification("All done.");
        assert_eq!(rest, "All done.");
        assert!(question.is_none());
    }
}
