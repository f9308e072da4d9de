//! Shared application state handed to every HTTP/WebSocket handler.

use std::sync::Arc;

use dialogue_agent::Agent;
use dialogue_config::Settings;
use dialogue_core::AgentProfile;
use dialogue_router::EventSink;
use dialogue_store::{FileSessionStore, OutputStore, SessionStore};

use crate::rate_limit::RateLimiter;
use crate::registry::default_roster;
use crate::session::SessionManager;

/// Everything a request handler needs. Cloned per-request — every field
/// is an `Arc`/cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub roster: Arc<Vec<AgentProfile>>,
    pub agents: Arc<Vec<Arc<Agent>>>,
    /// Shared raw executor handle, used to build a fresh `Summarizer` per
    /// request. Agent instances hold their own clone of the same
    /// handle.
    pub executor: Arc<dyn dialogue_core::Executor>,
    pub store: Arc<dyn SessionStore>,
    pub output_store: Arc<OutputStore>,
    pub sessions: Arc<SessionManager>,
    pub events: EventSink,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let roster = default_roster();
        let executor: Arc<dyn dialogue_core::Executor> =
            dialogue_executor::build_executor(&settings.executor).expect("executor backend builds").into();

        let agents: Vec<Arc<Agent>> = roster
            .iter()
            .map(|profile| Arc::new(Agent::new(profile.clone(), executor.clone(), settings.memory.clone())))
            .collect();

        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&settings.storage.data_dir));
        let output_store = Arc::new(OutputStore::new(&settings.storage.data_dir));
        let events = EventSink::default();
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            settings.server.max_sessions,
            std::time::Duration::from_secs(settings.server.session_timeout_seconds),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(settings.server.rate_limit.requests_per_minute));

        Self {
            settings: Arc::new(settings),
            roster: Arc::new(roster),
            agents: Arc::new(agents),
            executor,
            store,
            output_store,
            sessions,
            events,
            rate_limiter,
        }
    }

    /// The subset of the process roster's bound `Agent`s participating in
    /// `session`.
    pub fn agents_for(&self, session: &dialogue_core::Session) -> Vec<Arc<Agent>> {
        session
            .agents
            .iter()
            .filter_map(|profile| self.agents.iter().find(|a| a.profile().id == profile.id).cloned())
            .collect()
    }
}
