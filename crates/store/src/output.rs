//! Output artifact persistence.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{atomic_write, Result};

pub struct OutputStore {
    outputs_dir: PathBuf,
}

impl OutputStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { outputs_dir: data_dir.as_ref().join("outputs") }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.outputs_dir.join(format!("{id}.md"))
    }

    /// Write a new output artifact and return its generated id, suitable
    /// for `Session::record_output_file`.
    pub fn save_output(&self, content: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        atomic_write(&self.path_for(&id), content.as_bytes())?;
        Ok(id)
    }

    pub fn load_output(&self, id: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(id)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn delete_output(&self, id: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list_outputs(&self) -> Result<Vec<String>> {
        if !self.outputs_dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.outputs_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }
}
