use super::*;
use crate::cache::ResponseCache;
use crate::utils::RetryConfig;
use coco_llm::{MockProvider, ModelSelection};
use std::sync::Arc;

fn gateway(provider: Arc<MockProvider>) -> LlmGateway {
    LlmGateway::new(
        provider,
        Arc::new(ResponseCache::disabled()),
        ModelSelection::new("small", "large"),
    )
    .with_retry(RetryConfig::none())
}

#[test]
fn test_turn_input_parsing() {
    assert_eq!(
        TurnInput::parse("/code add a docstring to parse()"),
        TurnInput::explicit(AgentKind::Code, "add a docstring to parse()")
    );
    assert_eq!(
        TurnInput::parse("  /ask   what does main.py do?"),
        TurnInput::explicit(AgentKind::Ask, "what does main.py do?")
    );
    assert_eq!(TurnInput::parse("/search"), TurnInput::explicit(AgentKind::Search, ""));
    assert_eq!(TurnInput::parse("/status"), TurnInput::auto("/status"));
    assert_eq!(TurnInput::parse("fix the bug"), TurnInput::auto("fix the bug"));
}

#[test]
fn test_parse_classification() {
    assert_eq!(parse_classification("code 0.9"), Some((AgentKind::Code, 0.9)));
    assert_eq!(parse_classification("Search: 0.75"), Some((AgentKind::Search, 0.75)));
    assert_eq!(parse_classification("plan"), Some((AgentKind::Plan, 0.5)));
    assert_eq!(
        parse_classification("Category: ask (confidence 0.3)"),
        Some((AgentKind::Ask, 0.3))
    );
    assert_eq!(parse_classification("code 7"), Some((AgentKind::Code, 0.5)));
    assert_eq!(parse_classification("I am not sure"), None);
    assert_eq!(parse_classification(""), None);
}

#[tokio::test]
async fn test_explicit_command_skips_classification() {
    let provider = Arc::new(MockProvider::new());
    provider.push_reply("search 0.99");
    let router = Router::default();

    let decision = router
        .route(
            &TurnInput::explicit(AgentKind::Code, "add a docstring to parse()"),
            &gateway(Arc::clone(&provider)),
        )
        .await;

    assert_eq!(decision.agent, AgentKind::Code);
    assert!(decision.explicit);
    assert_eq!(decision.confidence, 1.0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_classification_selects_agent() {
    let provider = Arc::new(MockProvider::new());
    provider.push_reply("search 0.8");
    let router = Router::default();

    let decision = router
        .route(&TurnInput::auto("latest tokio release notes"), &gateway(Arc::clone(&provider)))
        .await;

    assert_eq!(decision.agent, AgentKind::Search);
    assert!(!decision.explicit);
    assert_eq!(decision.tier, ModelTier::Simple);

    let request = &provider.requests()[0];
    assert_eq!(request.model, "small");
    assert_eq!(request.params.max_tokens, 16);
    assert_eq!(request.params.temperature, 0.0);
}

#[tokio::test]
async fn test_low_confidence_and_ambiguity_fall_back_to_ask() {
    let provider = Arc::new(MockProvider::new());
    provider.push_reply("code 0.2");
    provider.push_reply("no idea");
    let router = Router::default();
    let gateway = gateway(Arc::clone(&provider));

    let low = router.route(&TurnInput::auto("hmm"), &gateway).await;
    assert_eq!(low.agent, AgentKind::Ask);
    assert_eq!(low.confidence, 0.2);

    let ambiguous = router.route(&TurnInput::auto("hmm again"), &gateway).await;
    assert_eq!(ambiguous.agent, AgentKind::Ask);
    assert_eq!(ambiguous.confidence, 0.0);
}

#[tokio::test]
async fn test_classification_failure_falls_back_to_ask() {
    let provider = Arc::new(MockProvider::new());
    provider.push_error(coco_llm::Error::Network("connection reset".to_string()));
    let router = Router::default();

    let decision = router
        .route(&TurnInput::auto("refactor everything"), &gateway(provider))
        .await;
    assert_eq!(decision.agent, AgentKind::Ask);
    assert_eq!(decision.confidence, 0.0);
    assert!(!decision.explicit);
}

#[test]
fn test_tier_policy() {
    let tiers = TierPolicy::default();

    assert_eq!(tiers.tier_for(AgentKind::Code, "add a docstring to parse()"), ModelTier::Simple);
    assert_eq!(
        tiers.tier_for(AgentKind::Code, "rename the helper and then update the callers"),
        ModelTier::Complex
    );
    assert_eq!(
        tiers.tier_for(AgentKind::Code, "move config loading from main.py into src/settings.py"),
        ModelTier::Complex
    );
    assert_eq!(
        tiers.tier_for(AgentKind::Plan, "refactor the storage layer"),
        ModelTier::Complex
    );
    // Ask is never complex, however broad the request
    assert_eq!(
        tiers.tier_for(AgentKind::Ask, "compare main.py and utils.py and then explain"),
        ModelTier::Simple
    );
}

#[test]
fn test_tier_policy_is_configurable() {
    let tiers = TierPolicy::from_settings(&RouterSettings {
        complex_agents: vec![AgentKind::Ask],
        multi_step_markers: vec!["Deep Dive".to_string()],
        multi_file_threshold: 3,
        ..RouterSettings::default()
    });
    assert_eq!(tiers.tier_for(AgentKind::Ask, "a deep dive into caching"), ModelTier::Complex);
    assert_eq!(tiers.tier_for(AgentKind::Code, "a deep dive into caching"), ModelTier::Simple);
    assert!(!tiers.is_multi_file("a.py b.py"));
    assert!(tiers.is_multi_file("a.py b.py src/c.rs"));
}

#[test]
fn test_file_references() {
    let refs = file_references("compare main.py, src/lib.rs and (main.py) with e.g. v1.2 at https://x.io/a");
    let refs: Vec<&str> = refs.iter().map(String::as_str).collect();
    assert_eq!(refs, vec!["main.py", "src/lib.rs"]);
}
