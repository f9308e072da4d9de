//! Filesystem-backed `Session` persistence.
//!
//! Rust's ownership model rules out the reference cycles the source's
//! object walker guarded against (no `Rc`/`RefCell` graph ever backs a
//! `Session`), so this store carries no seen-set or cycle sentinel; the
//! acyclic invariant is preserved structurally instead of
//! defensively. Likewise `DateTime<Utc>` cannot deserialize into an
//! invalid instant, so there is no `null`-on-invalid-date fallback to
//! implement — serde simply rejects a malformed timestamp at load time.
//! Missing structural fields (`sequenceNumber`, `stageHistory`,
//! `currentStage`, `status`) are filled by the `#[serde(default = ...)]`
//! attributes already on `Session`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dialogue_core::Session;

use crate::{atomic_write, Result};

/// Persistence operations a router depends on. Abstracted so
/// `dialogue-router` can be tested against an in-memory double without
/// touching a filesystem.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &Session) -> Result<()>;
    async fn load_session(&self, id: &str) -> Result<Option<Session>>;
    async fn delete_session(&self, id: &str) -> Result<bool>;
    /// Sorted by `updated_at` descending.
    async fn list_sessions(&self) -> Result<Vec<Session>>;
}

/// Whole-file-replacement JSON store under `<data_dir>/sessions/`.
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { sessions_dir: data_dir.as_ref().join("sessions") }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    /// A save is the realtime channel's commit point: the
    /// whole file is replaced via a temp-file-then-rename, so a
    /// concurrent reader never observes a partial write.
    async fn save_session(&self, session: &Session) -> Result<()> {
        let path = self.path_for(&session.id);
        let bytes = serde_json::to_vec_pretty(session)?;
        atomic_write(&path, &bytes)?;
        tracing::debug!(session_id = %session.id, sequence = session.sequence_number, "session persisted");
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>> {
        match std::fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        if !self.sessions_dir.exists() {
            return Ok(Vec::new());
        }
        let mut sessions = Vec::new();
        let mut seen_ids = HashSet::new();
        for entry in std::fs::read_dir(&self.sessions_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = std::fs::read(&path)?;
            match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => {
                    seen_ids.insert(session.id.clone());
                    sessions.push(session);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable session file");
                }
            }
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::{AgentPriority, AgentProfile, AgentStyle, Language, Version};

    fn sample_session(id: &str) -> Session {
        Session::new(
            id,
            "title",
            vec![AgentProfile::new("a1", "Alpha", AgentStyle::Logical, AgentPriority::Precision)],
            Language::En,
            Version::V1,
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let session = sample_session("s1");
        store.save_session(&session).await.unwrap();

        let loaded = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.sequence_number, session.sequence_number);
    }

    #[tokio::test]
    async fn load_missing_session_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.load_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_session_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save_session(&sample_session("s1")).await.unwrap();

        assert!(store.delete_session("s1").await.unwrap());
        assert!(!store.delete_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn list_sessions_sorted_by_updated_at_descending() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());

        let mut older = sample_session("older");
        older.updated_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = sample_session("newer");

        store.save_session(&older).await.unwrap();
        store.save_session(&newer).await.unwrap();

        let listed = store.list_sessions().await.unwrap();
        assert_eq!(listed[0].id, "newer");
        assert_eq!(listed[1].id, "older");
    }
}
