use super::*;
use crate::agents::AgentKind;
use crate::compression::CompressionOutcome;
use crate::config::CocoConfig;
use crate::executor::{ConfirmationBroker, Decision, FixedConfirmation, ScriptedConfirmation};
use crate::history::{HistoryLog, Role};
use crate::router::TurnInput;
use coco_llm::{LlmProvider, MockProvider, ModelTier};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Fixture {
    dir: TempDir,
    provider: Arc<MockProvider>,
    engine: WorkflowEngine,
}

impl Fixture {
    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("work")
    }
}

async fn fixture(tweak: impl FnOnce(&mut CocoConfig, &std::path::Path)) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("work");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/parser.py"), "def parse(text):\n    return text.split()\n").unwrap();

    let mut config = CocoConfig::default();
    config.model.simple_model = "small".to_string();
    config.model.complex_model = "large".to_string();
    config.memory.history_dir = Some(dir.path().join("history"));
    config.cache.enabled = false;
    config.retry.max_attempts = 1;
    tweak(&mut config, dir.path());

    let provider = Arc::new(MockProvider::new());
    let engine = build_engine(&config, &root, Arc::clone(&provider) as Arc<dyn LlmProvider>)
        .await
        .unwrap();
    Fixture {
        dir,
        provider,
        engine,
    }
}

fn completed(outcome: TurnOutcome) -> TurnReport {
    match outcome {
        TurnOutcome::Completed(report) => report,
        other => panic!("expected a completed turn, got {other:?}"),
    }
}

#[tokio::test]
async fn test_explicit_turn_is_recorded() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider.push_reply("parse() splits on whitespace.");

    let outcome = fx
        .engine
        .handle_turn(
            TurnInput::explicit(AgentKind::Ask, "what does parse do?"),
            CancellationToken::new(),
            &FixedConfirmation(Decision::Deny),
        )
        .await;
    let report = completed(outcome);

    assert_eq!(report.route.agent, AgentKind::Ask);
    assert!(report.route.explicit);
    assert_eq!(report.result.text.lines().next(), Some("parse() splits on whitespace."));
    assert_eq!(fx.engine.state().get(), WorkflowState::Idle);
    // explicit commands skip classification
    assert_eq!(fx.provider.call_count(), 1);

    let session = fx.engine.history().session();
    let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Agent]);
    assert!(session.total_tokens() > 0);

    let records = HistoryLog::read_all(fx.engine.history().log_path()).await.unwrap();
    let kinds: Vec<&str> = records.iter().map(|r| r.role.as_str()).collect();
    assert_eq!(kinds, vec!["system", "user", "agent"]);
}

#[tokio::test]
async fn test_auto_turn_is_classified_then_run_on_its_tier() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider.push_reply("code 0.9");
    fx.provider.push_reply("Nothing to change.");

    let report = completed(
        fx.engine
            .handle_turn(
                TurnInput::auto("fix the typo in src/parser.py"),
                CancellationToken::new(),
                &FixedConfirmation(Decision::Deny),
            )
            .await,
    );

    assert_eq!(report.route.agent, AgentKind::Code);
    assert_eq!(report.route.tier, ModelTier::Simple);
    let models: Vec<String> = fx.provider.requests().into_iter().map(|r| r.model).collect();
    assert_eq!(models, vec!["small", "small"]);
}

#[tokio::test]
async fn test_cancelled_turn_leaves_history_untouched() {
    let mut fx = fixture(|_, _| {}).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = fx
        .engine
        .handle_turn(
            TurnInput::explicit(AgentKind::Ask, "anything"),
            cancel,
            &FixedConfirmation(Decision::Deny),
        )
        .await;

    assert_eq!(outcome, TurnOutcome::Aborted);
    assert!(fx.engine.history().session().turns().is_empty());
    assert_eq!(fx.provider.call_count(), 0);
    assert_eq!(fx.engine.state().get(), WorkflowState::Idle);
}

#[tokio::test]
async fn test_cancel_while_awaiting_confirmation() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider.push_reply(
        "<tool_call>{\"name\": \"write_file\", \"arguments\": {\"path\": \"src/parser.py\", \
         \"content\": \"x = 1\\n\"}}</tool_call>",
    );
    let (broker, mut requests) = ConfirmationBroker::new();
    let state = fx.engine.state().clone();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let (outcome, ()) = tokio::join!(
        fx.engine.handle_turn(TurnInput::explicit(AgentKind::Code, "set x"), cancel, &broker),
        async move {
            let call = requests.recv().await.unwrap();
            assert_eq!(call.name, "write_file");
            assert_eq!(state.get(), WorkflowState::ToolAwaitingConfirmation);
            trigger.cancel();
        }
    );

    assert_eq!(outcome, TurnOutcome::Aborted);
    assert!(broker.pending().await.is_empty());
    assert!(fx.engine.history().session().turns().is_empty());
    assert_eq!(
        std::fs::read_to_string(fx.root().join("src/parser.py")).unwrap(),
        "def parse(text):\n    return text.split()\n"
    );
    assert_eq!(fx.engine.state().get(), WorkflowState::Idle);
}

#[tokio::test]
async fn test_provider_failure_keeps_session_resumable() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider
        .push_error(coco_llm::Error::Auth("invalid x-api-key".to_string()));

    let outcome = fx
        .engine
        .handle_turn(
            TurnInput::explicit(AgentKind::Ask, "hello"),
            CancellationToken::new(),
            &FixedConfirmation(Decision::Deny),
        )
        .await;

    let TurnOutcome::Failed { hint, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(hint.unwrap().contains("ANTHROPIC_API_KEY"));
    assert_eq!(fx.engine.history().session().turns().len(), 2);

    fx.provider.push_reply("Hello again.");
    let report = completed(
        fx.engine
            .handle_turn(
                TurnInput::explicit(AgentKind::Ask, "hello"),
                CancellationToken::new(),
                &FixedConfirmation(Decision::Deny),
            )
            .await,
    );
    assert!(report.result.text.starts_with("Hello again."));
}

#[tokio::test]
async fn test_denied_tool_turn_is_recorded() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider.push_reply(
        "<tool_call>{\"name\": \"write_file\", \"arguments\": {\"path\": \"src/parser.py\", \
         \"content\": \"x = 1\\n\"}}</tool_call>",
    );
    fx.provider.push_reply("The edit was declined, so nothing changed.");

    let report = completed(
        fx.engine
            .handle_turn(
                TurnInput::explicit(AgentKind::Code, "set x"),
                CancellationToken::new(),
                &ScriptedConfirmation::new([Decision::Deny]),
            )
            .await,
    );

    assert_eq!(report.result.denied().count(), 1);
    let turns = fx.engine.history().session().turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].role, Role::Tool);
    assert!(turns[1].content.starts_with("write src/parser.py (6 bytes) -> [DENIED]"));
}

#[tokio::test]
async fn test_over_budget_session_is_compressed() {
    let mut fx = fixture(|config, _| {
        config.memory.max_token_limit = 20;
        config.memory.keep_recent_turns = 2;
    })
    .await;
    let long = "The parser module splits text on whitespace and returns a list of words. ".repeat(2);
    fx.provider.push_reply(long.clone());
    fx.provider.push_reply(long);
    fx.provider.push_reply("Discussed parse().");

    let first = completed(
        fx.engine
            .handle_turn(
                TurnInput::explicit(AgentKind::Search, "parser behaviour"),
                CancellationToken::new(),
                &FixedConfirmation(Decision::Deny),
            )
            .await,
    );
    assert!(matches!(first.compression, Some(CompressionOutcome::NothingToFold { .. })));

    let second = completed(
        fx.engine
            .handle_turn(
                TurnInput::explicit(AgentKind::Search, "parser behaviour again"),
                CancellationToken::new(),
                &FixedConfirmation(Decision::Deny),
            )
            .await,
    );
    assert!(matches!(
        second.compression,
        Some(CompressionOutcome::Compressed { folded: 2, .. })
    ));

    let session = fx.engine.history().session();
    assert_eq!(session.turns().len(), 2);
    assert_eq!(session.summary().unwrap().content, "Discussed parse().");
    assert_eq!(session.turns()[0].content, "parser behaviour again");
}

#[tokio::test]
async fn test_identical_turns_are_served_from_cache() {
    let mut fx = fixture(|config, dir| {
        config.cache.enabled = true;
        config.cache.path = Some(dir.join("cache").join("llm_cache.db"));
    })
    .await;
    fx.provider.push_reply("It splits text.");

    for _ in 0..2 {
        let report = completed(
            fx.engine
                .handle_turn(
                    TurnInput::explicit(AgentKind::Search, "what does parse do?"),
                    CancellationToken::new(),
                    &FixedConfirmation(Decision::Deny),
                )
                .await,
        );
        assert_eq!(report.result.text, "It splits text.");
    }
    assert_eq!(fx.provider.call_count(), 1);
    assert_eq!(fx.engine.gateway().cache().backend(), "sqlite");
    assert_eq!(fx.engine.gateway().cache().stats().hits, 1);
}

#[tokio::test]
async fn test_reset_starts_a_fresh_session() {
    let mut fx = fixture(|_, _| {}).await;
    fx.provider.push_reply("ok");
    fx.engine
        .handle_turn(
            TurnInput::explicit(AgentKind::Search, "x"),
            CancellationToken::new(),
            &FixedConfirmation(Decision::Deny),
        )
        .await;
    let first_id = fx.engine.history().session().id();

    fx.engine.reset().await.unwrap();

    assert_ne!(fx.engine.history().session().id(), first_id);
    assert!(fx.engine.history().session().turns().is_empty());
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let mut fx = fixture(|_, _| {}).await;
    let outcome = fx
        .engine
        .handle_turn(
            TurnInput::auto("   "),
            CancellationToken::new(),
            &FixedConfirmation(Decision::Deny),
        )
        .await;
    assert!(matches!(outcome, TurnOutcome::Failed { .. }));
    assert_eq!(fx.provider.call_count(), 0);
}

#[tokio::test]
async fn test_rebuild_index_and_status() {
    let fx = fixture(|_, _| {}).await;
    let report = fx.engine.rebuild_index().await.unwrap();
    assert_eq!(report.files_processed, 1);

    let status = fx.engine.status().await;
    assert_eq!(status.simple_model, "small");
    assert_eq!(status.complex_model, "large");
    assert_eq!(status.cache_backend, "disabled");
    assert_eq!(status.index.unwrap().files, 1);
    assert_eq!(status.session_turns, 0);
}
