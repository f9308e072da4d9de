//! In-memory activity tracking layered over the persisted `Session`
//! store, plus a background expiry sweep.
//!
//! The `Session` aggregate itself is always read from/written through
//! `dialogue_store::SessionStore`; this manager only tracks last-touch
//! timestamps so idle sessions can be capacity-reclaimed without ever
//! deleting their persisted file (expiry here is bookkeeping, not data
//! loss — a caller can always reload an "expired" session from disk).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dialogue_core::Session;
use dialogue_store::{Result as StoreResult, SessionStore};
use parking_lot::RwLock;
use tokio::sync::watch;

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    activity: RwLock<HashMap<String, Instant>>,
    max_sessions: usize,
    session_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, max_sessions: usize, session_timeout: Duration) -> Self {
        Self { store, activity: RwLock::new(HashMap::new()), max_sessions, session_timeout }
    }

    /// Start the idle-bookkeeping sweep; returns a sender the caller can
    /// use to shut the task down.
    pub fn start_cleanup_task(self: &Arc<Self>, cleanup_interval: Duration) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = manager.sweep_expired();
                        if removed > 0 {
                            tracing::info!(removed, "cleared idle session bookkeeping entries");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    pub fn touch(&self, id: &str) {
        self.activity.write().insert(id.to_string(), Instant::now());
    }

    pub fn forget(&self, id: &str) {
        self.activity.write().remove(id);
    }

    /// Persist a freshly created session and record its activity,
    /// enforcing `max_sessions` against the persisted store's count.
    pub async fn register(&self, session: &Session) -> StoreResult<()> {
        if self.tracked_count() >= self.max_sessions {
            self.sweep_expired();
        }
        self.store.save_session(session).await?;
        self.touch(&session.id);
        Ok(())
    }

    pub fn tracked_count(&self) -> usize {
        self.activity.read().len()
    }

    fn sweep_expired(&self) -> usize {
        let timeout = self.session_timeout;
        let mut activity = self.activity.write();
        let before = activity.len();
        activity.retain(|_, last| last.elapsed() < timeout);
        before - activity.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::{AgentPriority, AgentProfile, AgentStyle, Language, Version};
    use dialogue_store::FileSessionStore;

    fn sample(id: &str) -> Session {
        Session::new(
            id,
            "title",
            vec![AgentProfile::new("a1", "Alpha", AgentStyle::Logical, AgentPriority::Precision)],
            Language::En,
            Version::V1,
        )
    }

    #[tokio::test]
    async fn register_tracks_activity() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(dir.path()));
        let manager = SessionManager::new(store, 10, Duration::from_secs(3600));

        manager.register(&sample("s1")).await.unwrap();
        assert_eq!(manager.tracked_count(), 1);

        manager.forget("s1");
        assert_eq!(manager.tracked_count(), 0);
    }
}
