//! Recording-state persistence.
//!
//! The recorder bootstraps its flag from a `SessionStore` when a session
//! opens, so a stop/start of the host picks up where the user left off.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub use weaver_common::error::StoreError;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<bool, StoreError>;
    async fn save(&self, recording: bool) -> Result<(), StoreError>;
}

/// In-memory store for tests and for sessions without a state file.
#[derive(Clone, Default)]
pub struct MemoryStore {
    flag: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new(initial: bool) -> Self {
        Self {
            flag: Arc::new(Mutex::new(initial)),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<bool, StoreError> {
        Ok(*self.flag.lock().unwrap())
    }

    async fn save(&self, recording: bool) -> Result<(), StoreError> {
        *self.flag.lock().unwrap() = recording;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    recording: bool,
}

/// Single JSON document on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self) -> Result<bool, StoreError> {
        // A missing file is a first run, not an error.
        if !self.path.exists() {
            return Ok(false);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let state: PersistedState = serde_json::from_str(&content)?;
        Ok(state.recording)
    }

    async fn save(&self, recording: bool) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let state = PersistedState { recording };
        tokio::fs::write(&self.path, serde_json::to_vec(&state)?).await?;
        Ok(())
    }
}
