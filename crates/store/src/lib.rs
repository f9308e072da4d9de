//! Filesystem-backed persistence for sessions, facilitator logs, and output
//! artifacts.
//!
//! Every write goes through [`atomic_write`]: content is written to a sibling
//! temp file and renamed into place, so a reader never observes a partially
//! written file.

mod facilitator_log;
mod output;
mod session_store;

pub use facilitator_log::save_facilitator_log;
pub use output::OutputStore;
pub use session_store::{FileSessionStore, SessionStore};

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for dialogue_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => dialogue_core::Error::SessionNotFound(id),
            other => dialogue_core::Error::Serialization(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Writes `contents` to `path` via a temp file in the same directory followed
/// by a rename, so concurrent readers never see a half-written file.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("store")
    ));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parent_dirs_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn atomic_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
