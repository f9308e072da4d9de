//! End-to-end coverage for both dialogue regimes,
//! driven against `MockExecutor` and a tempdir-backed store so no real
//! language-model backend is required.

use std::sync::Arc;

use dialogue_agent::Agent;
use dialogue_config::{ConsensusConfig, FacilitatorConfig, MemoryConfig, RouterConfig};
use dialogue_core::{AgentPriority, AgentProfile, AgentStyle, Language, Session, Version};
use dialogue_executor::MockExecutor;
use dialogue_facilitator::Facilitator;
use dialogue_router::{DynamicRouter, EventSink, StagedRouter};
use dialogue_store::{FileSessionStore, OutputStore, SessionStore};
use dialogue_summarizer::Summarizer;

fn roster() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("agent-a", "Alpha", AgentStyle::Logical, AgentPriority::Precision),
        AgentProfile::new("agent-b", "Beta", AgentStyle::Emotive, AgentPriority::Breadth),
        AgentProfile::new("agent-c", "Gamma", AgentStyle::Critical, AgentPriority::Depth),
    ]
}

fn bound_agents() -> Vec<Arc<Agent>> {
    let executor: Arc<dyn dialogue_core::Executor> = Arc::new(MockExecutor::default());
    roster()
        .into_iter()
        .map(|profile| Arc::new(Agent::new(profile, executor.clone(), MemoryConfig::default())))
        .collect()
}

/// A full v1 sequence runs every stage, elects a finalizer, and reaches
/// `Completed` with a recorded output artifact.
#[tokio::test]
async fn v1_sequence_completes_and_records_output() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir.path()));
    let output_store = Arc::new(OutputStore::new(dir.path()));
    let executor: Arc<dyn dialogue_core::Executor> = Arc::new(MockExecutor::default());
    let summarizer = Summarizer::new(executor);

    let router = StagedRouter::new(
        bound_agents(),
        summarizer,
        store.clone(),
        output_store,
        RouterConfig { inter_agent_delay_ms: 0, summarizer_delay_ms: 0, ..RouterConfig::default() },
        EventSink::default(),
    )
    .with_seed(7);

    let mut session = Session::new("s1", "budget plan", roster(), Language::En, Version::V1);
    router.run_sequence(&mut session, "How should we split the Q3 budget?").await.unwrap();

    assert_eq!(session.status, dialogue_core::SessionStatus::Completed);
    assert!(session.sequence_output_files.as_ref().unwrap().contains_key(&1));
    assert!(!session.stage_history.is_empty());

    let reloaded = store.load_session("s1").await.unwrap().unwrap();
    assert_eq!(reloaded.status, dialogue_core::SessionStatus::Completed);
}

/// Re-running a completed v1 session starts a fresh sequence rather than
/// erroring.
#[tokio::test]
async fn v1_session_reopens_for_a_second_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir.path()));
    let output_store = Arc::new(OutputStore::new(dir.path()));
    let executor: Arc<dyn dialogue_core::Executor> = Arc::new(MockExecutor::default());
    let summarizer = Summarizer::new(executor);

    let router = StagedRouter::new(
        bound_agents(),
        summarizer,
        store,
        output_store,
        RouterConfig { inter_agent_delay_ms: 0, summarizer_delay_ms: 0, ..RouterConfig::default() },
        EventSink::default(),
    )
    .with_seed(3);

    let mut session = Session::new("s2", "roadmap", roster(), Language::En, Version::V1);
    router.run_sequence(&mut session, "first topic").await.unwrap();
    router.run_sequence(&mut session, "second topic").await.unwrap();

    assert_eq!(session.sequence_number, 2);
    assert_eq!(session.status, dialogue_core::SessionStatus::Completed);
    assert_eq!(session.sequence_output_files.as_ref().unwrap().len(), 2);
}

/// A v2 sequence runs at least one round, persists a facilitator log, and
/// converges to `Completed` within `max_rounds`.
#[tokio::test]
async fn v2_sequence_converges_within_max_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir.path()));
    let output_store = Arc::new(OutputStore::new(dir.path()));
    let facilitator = Facilitator::new(FacilitatorConfig::default());

    let consensus_config = ConsensusConfig { max_rounds: 5, ..ConsensusConfig::default() }.clamp();

    let router = DynamicRouter::new(
        bound_agents(),
        facilitator,
        store.clone(),
        output_store,
        dir.path(),
        consensus_config,
        RouterConfig { inter_agent_delay_ms: 0, summarizer_delay_ms: 0, ..RouterConfig::default() },
        EventSink::default(),
    );

    let mut session = Session::new("s3", "vendor choice", roster(), Language::En, Version::V2);
    router.run_sequence(&mut session, "Which vendor should we pick?").await.unwrap();

    assert_eq!(session.status, dialogue_core::SessionStatus::Completed);
    assert!(session.consensus_history.as_ref().map(|h| !h.is_empty()).unwrap_or(false));

    let log_dir = dir.path().join("logs").join("s3").join("facilitator");
    assert!(log_dir.exists(), "facilitator log directory should be flushed at session end");
    assert!(std::fs::read_dir(&log_dir).unwrap().next().is_some());
}
