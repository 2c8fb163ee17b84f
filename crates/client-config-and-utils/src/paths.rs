//! File system paths for the client.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for client files (~/.nutri)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.nutri`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".nutri"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `~/.nutri/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `~/.nutri/storage.json`, the persisted key-value slot holding the token.
    pub fn storage_file(&self) -> PathBuf {
        self.base_dir.join("storage.json")
    }

    /// `~/.nutri/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `~/.nutri/logs/client.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("client.jsonl")
    }

    /// Ensure the base and log directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
