//! System and context prompts
//!
//! Prompts are built only from the session, the index results and the
//! registry, in a fixed order, so the same turn always yields the same
//! messages and can be answered from the response cache.

use super::kind::AgentKind;
use coco_index::ScoredChunk;
use coco_tools::builtins::format_chunks;
use coco_tools::ToolRegistry;
use crate::history::Session;
use serde_json::json;

/// Name of the session recall tool served by the agent itself
pub const RECALL_TOOL: &str = "recall_history";

const PROTOCOL: &str = "## Tools
To use a tool, reply with one or more blocks of exactly this form and nothing after them:
<tool_call>
{\"name\": \"<tool name>\", \"arguments\": {<arguments as JSON>}}
</tool_call>
Results come back in <tool_result name=\"...\"> blocks. A result starting with [DENIED] means \
the user declined the call: nothing ran and nothing changed, so do not retry it.
When you are done, reply with your answer and no tool_call blocks.
If the request is ambiguous and you cannot proceed, reply with \
[CLARIFY]your question[/CLARIFY] instead of guessing.";

fn role_instructions(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Code => "You are the code agent of coco, a terminal coding assistant working \
in the user's repository. Make precise, minimal changes. Read a file before you change it. \
write_file replaces the whole file, so always send its complete new content. Every edit and \
command is shown to the user for approval. After an approved edit you are shown the file as it \
now is; base any further edit on that content. Finish with a short account of what changed \
and anything that was not applied.",
        AgentKind::Plan => "You are the planning agent of coco, a terminal coding assistant. \
You do not modify anything. Produce an implementation plan in Markdown with these sections:
## Overview
## Steps
1. **Step name** (Complexity: Low|Medium|High)
   - details, files involved
## Dependencies
## Risks",
        AgentKind::Ask => "You are the question-answering agent of coco, a terminal coding \
assistant. You only read. Answer concisely from the code context, the files you read and the \
conversation, and name the files your answer relies on. Use recall_history to look up earlier \
parts of this session.",
        AgentKind::Search => "You are the research agent of coco, a terminal coding assistant. \
Use web_search to find current documentation, releases and known issues. Summarize what you \
found and cite the URLs you used.",
    }
}

fn recall_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "Words to look for in earlier turns"},
            "limit": {"type": "integer", "description": "Maximum turns to return", "default": 5}
        },
        "required": ["query"]
    })
}

/// System prompt for `kind`, listing the tools it may use
///
/// Tools in the agent's set that are not registered (for example index
/// tools without an index) are left out.
#[must_use]
pub fn system_prompt(kind: AgentKind, registry: &ToolRegistry) -> String {
    let mut tools = Vec::new();
    for name in kind.tools() {
        if *name == RECALL_TOOL {
            tools.push(format!(
                "- {RECALL_TOOL}: Search earlier turns of this session by keyword\n  arguments: {}",
                recall_schema()
            ));
        } else if let Some(def) = registry.get_definition(name) {
            tools.push(format!(
                "- {}: {}\n  arguments: {}",
                def.name, def.description, def.parameters
            ));
        }
    }

    let mut prompt = role_instructions(kind).to_string();
    if !tools.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(PROTOCOL);
        prompt.push_str("\n\nAvailable tools:\n");
        prompt.push_str(&tools.join("\n"));
    }
    prompt
}

/// What the index contributed to the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum CodeContext {
    /// The agent does not use code context
    NotUsed,
    /// Chunks retrieved for the utterance
    Chunks(Vec<ScoredChunk>),
    /// The index could not be queried
    Unavailable(String),
}

/// The first user message of an agent run
#[must_use]
pub fn context_message(
    session: &Session,
    context_turns: usize,
    code: &CodeContext,
    utterance: &str,
) -> String {
    let mut sections = Vec::new();

    if let Some(summary) = session.summary() {
        sections.push(format!("## Earlier in this session\n{}", summary.content));
    }

    let recent = session.recent(context_turns);
    if !recent.is_empty() {
        let lines: Vec<String> = recent.iter().map(|t| t.transcript_line()).collect();
        sections.push(format!("## Recent turns\n{}", lines.join("\n")));
    }

    match code {
        CodeContext::NotUsed => {}
        CodeContext::Chunks(chunks) if chunks.is_empty() => {
            sections.push("## Code context\nNo indexed code matched this request.".to_string());
        }
        CodeContext::Chunks(chunks) => {
            sections.push(format!("## Code context\n{}", format_chunks(chunks)));
        }
        CodeContext::Unavailable(reason) => {
            sections.push(format!(
                "## Code context\nThe code index is unavailable ({reason}). Work from the files \
                 you can read."
            ));
        }
    }

    sections.push(format!("## Request\n{}", utterance.trim()));
    sections.join("\n\n")
}
