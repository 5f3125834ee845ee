//! The "brain" — key-value persistence for job state.
//!
//! The scheduler writes a full snapshot of the job list on every mutation
//! and reads it back once at startup. The store key is a fixed logical name
//! (default "jobs"); the on-disk shape is owned entirely by the brain
//! implementation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::reminder::types::PersistedJob;

pub trait Brain: Send + Sync {
    /// Load the job list stored under `key`, or `None` if nothing was saved.
    fn load(&self, key: &str) -> Result<Option<Vec<PersistedJob>>>;

    /// Replace the job list stored under `key`.
    fn save(&self, key: &str, jobs: &[PersistedJob]) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BrainRecord {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    jobs: Vec<PersistedJob>,
}

fn default_version() -> u32 {
    1
}

/// JSON-file brain: one pretty-printed file per key under `dir`.
pub struct FileBrain {
    dir: PathBuf,
}

impl FileBrain {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Brain for FileBrain {
    fn load(&self, key: &str) -> Result<Option<Vec<PersistedJob>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let record: BrainRecord = serde_json::from_str(&text)?;
        Ok(Some(record.jobs))
    }

    fn save(&self, key: &str, jobs: &[PersistedJob]) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = BrainRecord {
            version: default_version(),
            jobs: jobs.to_vec(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

/// In-memory brain, used by tests and the offline CLI dry-run path.
#[derive(Default)]
pub struct MemoryBrain {
    entries: Mutex<HashMap<String, Vec<PersistedJob>>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Brain for MemoryBrain {
    fn load(&self, key: &str) -> Result<Option<Vec<PersistedJob>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, jobs: &[PersistedJob]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), jobs.to_vec());
        Ok(())
    }
}
