use super::*;
use crate::cache::ResponseCache;
use crate::executor::{Decision, FixedConfirmation, ScriptedConfirmation, ToolExecutor};
use crate::gateway::LlmGateway;
use crate::history::{Session, Turn};
use crate::utils::RetryConfig;
use crate::workflow::StateHandle;
use coco_index::{CodeIndex, IndexConfig, LexicalIndex};
use coco_llm::{MockProvider, ModelSelection, ModelTier};
use coco_tools::{register_builtins, BuiltinsConfig, ToolRegistry, ToolRunner};
use std::sync::Arc;
use tempfile::TempDir;

const PARSER: &str = "def parse(text):\n    return text.split()\n";

struct Fixture {
    dir: TempDir,
    provider: Arc<MockProvider>,
    runner: AgentRunner,
}

async fn fixture(with_index: bool, options: AgentOptions) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/parser.py"), PARSER).unwrap();

    let index: Option<Arc<dyn CodeIndex>> = if with_index {
        let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
        index.rebuild().await.unwrap();
        Some(Arc::new(index))
    } else {
        None
    };

    let mut builtins = BuiltinsConfig::new(dir.path());
    if let Some(index) = &index {
        builtins = builtins.with_index(Arc::clone(index), 5);
    }
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &builtins);
    let executor = ToolExecutor::new(ToolRunner::with_defaults(Arc::new(registry)));

    let provider = Arc::new(MockProvider::new());
    let gateway = LlmGateway::new(
        Arc::clone(&provider) as Arc<dyn coco_llm::LlmProvider>,
        Arc::new(ResponseCache::disabled()),
        ModelSelection::new("small", "large"),
    )
    .with_retry(RetryConfig::none());

    Fixture {
        dir,
        provider,
        runner: AgentRunner::new(Arc::new(gateway), executor, index, options),
    }
}

fn task<'a>(agent: AgentKind, utterance: &'a str, session: &'a Session) -> AgentTask<'a> {
    AgentTask {
        agent,
        tier: ModelTier::Complex,
        utterance,
        session,
    }
}

fn write_call(content: &str) -> String {
    format!(
        "<tool_call>\n{}\n</tool_call>",
        serde_json::json!({
            "name": "write_file",
            "arguments": {"path": "src/parser.py", "content": content}
        })
    )
}

fn last_user_message(provider: &MockProvider, request: usize) -> String {
    provider.requests()[request]
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_ask_answers_with_code_context() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply("parse() splits text on whitespace (src/parser.py).");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Ask, "what does parse do?", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "parse() splits text on whitespace (src/parser.py).");
    assert!(result.tool_calls_made.is_empty());
    assert!(result.terminal);
    assert!(!result.degraded && !result.partial);
    assert_eq!(result.steps, 1);

    let request = &fx.provider.requests()[0];
    assert_eq!(request.model, "large");
    assert!(request.messages[0].content.contains("recall_history"));
    assert!(request.messages[1].content.contains("src/parser.py"));
    assert!(request.messages[1].content.ends_with("## Request\nwhat does parse do?"));
}

#[tokio::test]
async fn test_missing_index_degrades_instead_of_failing() {
    let fx = fixture(false, AgentOptions::default()).await;
    fx.provider.push_reply("It probably splits text.");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Ask, "what does parse do?", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert!(result.degraded);
    assert!(result.text.starts_with("It probably splits text."));
    assert!(result.text.contains("without code index context"));
    assert!(fx.provider.requests()[0].messages[1].content.contains("unavailable"));
    // index tools are not offered when there is no index
    assert!(!fx.provider.requests()[0].messages[0].content.contains("search_codebase"));
}

#[tokio::test]
async fn test_search_agent_skips_code_context() {
    let fx = fixture(true, AgentOptions::default()).await;
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Search, "latest tokio release", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert!(!result.degraded);
    assert!(!fx.provider.requests()[0].messages[1].content.contains("## Code context"));
}

#[tokio::test]
async fn test_approved_edit_is_reread_and_indexed() {
    let fx = fixture(true, AgentOptions::default()).await;
    let new_content = "\"\"\"Split text into words.\"\"\"\n\ndef parse(text):\n    return text.split()\n";
    fx.provider.push_reply(format!("Adding a docstring.\n{}", write_call(new_content)));
    fx.provider.push_reply("Added a module docstring to src/parser.py.");
    let session = Session::new();
    let channel = ScriptedConfirmation::new([Decision::Approve]);

    let result = fx
        .runner
        .run(
            task(AgentKind::Code, "add a docstring to parser.py", &session),
            &channel,
            &StateHandle::new(),
        )
        .await
        .unwrap();

    let written = std::fs::read_to_string(fx.dir.path().join("src/parser.py")).unwrap();
    assert_eq!(written, new_content);

    let trace: Vec<(&str, ToolStatus)> = result
        .tool_calls_made
        .iter()
        .map(|r| (r.name.as_str(), r.status))
        .collect();
    assert_eq!(
        trace,
        vec![("write_file", ToolStatus::Executed), ("read_file", ToolStatus::Executed)]
    );
    assert_eq!(channel.presented().len(), 1);

    let observations = last_user_message(&fx.provider, 1);
    assert!(observations.contains("<tool_result name=\"write_file\">"));
    assert!(observations.contains("Current content of src/parser.py after the edit:"));
    assert!(observations.contains("Split text into words."));

    let index = LexicalIndex::open(IndexConfig::new(fx.dir.path())).await.unwrap();
    let hits = index.query("docstring words split", 1).await.unwrap();
    assert!(hits[0].chunk.text.contains("Split text into words."));
}

#[tokio::test]
async fn test_denied_edit_is_not_applied() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply(write_call("broken"));
    fx.provider.push_reply("I could not apply the docstring because the edit was declined.");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Code, "add a docstring to parser.py", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    let content = std::fs::read_to_string(fx.dir.path().join("src/parser.py")).unwrap();
    assert_eq!(content, PARSER);
    assert_eq!(result.tool_calls_made.len(), 1);
    assert_eq!(result.tool_calls_made[0].status, ToolStatus::Denied);
    assert_eq!(result.executed_trace().count(), 0);
    assert_eq!(result.denied().count(), 1);
    assert!(result.text.contains("Declined, not applied: write src/parser.py (6 bytes)"));
    assert!(last_user_message(&fx.provider, 1).contains("[DENIED]"));
}

#[tokio::test]
async fn test_calls_after_an_edit_are_skipped() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider
        .push_reply(format!("{}\n{}", write_call("first = 1\n"), write_call("second = 2\n")));
    fx.provider.push_reply("Done.");
    let session = Session::new();
    let channel = ScriptedConfirmation::new([Decision::Approve]);

    let result = fx
        .runner
        .run(task(AgentKind::Code, "rewrite parser.py", &session), &channel, &StateHandle::new())
        .await
        .unwrap();

    let statuses: Vec<ToolStatus> = result.tool_calls_made.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![ToolStatus::Executed, ToolStatus::Executed, ToolStatus::Skipped]
    );
    assert_eq!(channel.presented().len(), 1);
    assert_eq!(
        std::fs::read_to_string(fx.dir.path().join("src/parser.py")).unwrap(),
        "first = 1\n"
    );
}

#[tokio::test]
async fn test_tools_outside_the_set_are_refused() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply(write_call("plan agents must not write"));
    fx.provider.push_reply("## Steps\n1. **Add docstring** (Complexity: Low)");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Plan, "plan a docstring change", &session),
            &FixedConfirmation(Decision::Approve),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert!(result.tool_calls_made.is_empty());
    assert_eq!(
        std::fs::read_to_string(fx.dir.path().join("src/parser.py")).unwrap(),
        PARSER
    );
    assert!(last_user_message(&fx.provider, 1).contains("not available to the plan agent"));

    let plan = result.plan.unwrap();
    assert_eq!(plan.steps[0].title, "Add docstring");
    assert_eq!(plan.steps[0].complexity, Complexity::Low);
}

#[tokio::test]
async fn test_malformed_call_becomes_observation() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply("<tool_call>{\"name\": read_file}</tool_call>");
    fx.provider.push_reply("Sorry, here is the answer.");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Ask, "show parser", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.steps, 2);
    assert!(last_user_message(&fx.provider, 1).contains("Error: tool call is not valid JSON"));
}

#[tokio::test]
async fn test_step_limit_yields_partial_result() {
    let fx = fixture(true, AgentOptions::default().with_max_steps(3)).await;
    for _ in 0..5 {
        fx.provider.push_reply(
            "Still looking.\n<tool_call>{\"name\": \"list_directory\", \"arguments\": {}}</tool_call>",
        );
    }
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Code, "explore", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert!(result.terminal && result.partial);
    assert_eq!(result.steps, 3);
    assert_eq!(fx.provider.call_count(), 3);
    assert_eq!(result.executed_trace().count(), 3);
    assert!(result.text.starts_with("Still looking."));
    assert!(result.text.contains("partial"));
}

#[tokio::test]
async fn test_provider_failure_is_reported_with_hint() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider
        .push_error(coco_llm::Error::Auth("invalid x-api-key".to_string()));
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Ask, "hi", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert!(result.terminal);
    let failure = result.failure.unwrap();
    assert!(failure.hint.unwrap().contains("ANTHROPIC_API_KEY"));
    assert_eq!(result.steps, 0);
}

#[tokio::test]
async fn test_confirmation_failure_aborts_the_run() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply(write_call("x = 1\n"));
    let session = Session::new();

    let err = fx
        .runner
        .run(
            task(AgentKind::Code, "edit", &session),
            &ScriptedConfirmation::new([]),
            &StateHandle::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, crate::Error::Aborted(_)));
    assert_eq!(
        std::fs::read_to_string(fx.dir.path().join("src/parser.py")).unwrap(),
        PARSER
    );
}

#[tokio::test]
async fn test_recall_history_searches_the_session() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider.push_reply(
        "<tool_call>{\"name\": \"recall_history\", \"arguments\": {\"query\": \"tokenizer\"}}</tool_call>",
    );
    fx.provider.push_reply("Earlier you asked about the tokenizer.");

    let dir = tempfile::tempdir().unwrap();
    let mut history = crate::history::HistoryStore::open(dir.path()).await.unwrap();
    history.append(Turn::user("how does the tokenizer handle tabs?")).await.unwrap();
    history
        .append(Turn::agent(AgentKind::Ask, "It treats them as whitespace."))
        .await
        .unwrap();

    let result = fx
        .runner
        .run(
            task(AgentKind::Ask, "what did I ask before?", history.session()),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.tool_calls_made[0].name, "recall_history");
    assert!(result.tool_calls_made[0]
        .observation
        .contains("[user] how does the tokenizer handle tabs?"));
}

#[tokio::test]
async fn test_clarification_is_surfaced() {
    let fx = fixture(true, AgentOptions::default()).await;
    fx.provider
        .push_reply("[CLARIFY]Which parser do you mean, src/parser.py or the CLI one?[/CLARIFY]");
    let session = Session::new();

    let result = fx
        .runner
        .run(
            task(AgentKind::Code, "fix the parser", &session),
            &FixedConfirmation(Decision::Deny),
            &StateHandle::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        result.clarification.as_deref(),
        Some("Which parser do you mean, src/parser.py or the CLI one?")
    );
    assert_eq!(result.text, "Which parser do you mean, src/parser.py or the CLI one?");
}

#[test]
fn test_recall_ranks_by_matching_terms() {
    let mut session = Session::new();
    session.extend(vec![
        Turn::user("the parser drops tabs"),
        Turn::user("unrelated question about logging"),
        Turn::user("parser tabs and the tokenizer"),
    ]);

    let out = recall(&session, "parser tokenizer", 5);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("#3 "));
    assert!(lines[1].starts_with("#1 "));

    assert!(recall(&session, "database", 5).starts_with("No earlier turns mention"));
    assert!(recall(&session, "a", 5).starts_with("Error:"));
}
