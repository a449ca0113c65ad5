//! Persisted key/value state.
//!
//! The dashboard keeps three string values across runs: the GitHub token,
//! the theme preference, and the pending-operation list. They live in a
//! single JSON object file under the platform data directory, read and
//! written whole under an fs2 file lock so concurrent tasks see each call
//! as atomic. Reads always go back to disk; mutation flows re-read before
//! writing (read-modify-write per call, best effort, not transactional).

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Fixed key for the GitHub personal access token; removed on logout.
pub const KEY_TOKEN: &str = "gh_demo_pat";

/// Fixed key for the theme preference ("light" | "dark").
pub const KEY_THEME: &str = "theme";

/// Fixed key for the JSON-encoded pending-operation list.
pub const KEY_PENDING_OPS: &str = "pending_ops";

/// Narrow key/value interface so the reconciliation engine can be driven
/// by an in-memory store in tests.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one JSON object, string values only.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default platform data location.
    pub fn default_location() -> Result<Self> {
        let dir = directories::ProjectDirs::from("", "", "demodeck")
            .context("Could not determine data directory")?
            .data_dir()
            .to_path_buf();
        Ok(Self::new(dir.join("state.json")))
    }

    fn read_map(&self) -> Map<String, Value> {
        let Ok(mut file) = File::open(&self.path) else {
            return Map::new();
        };
        // Fully qualified: std::fs::File grew identically named lock methods.
        if let Err(e) = fs2::FileExt::lock_shared(&file) {
            tracing::warn!("Failed to lock state file for reading: {}", e);
            return Map::new();
        }
        let mut content = String::new();
        let result = file.read_to_string(&mut content);
        let _ = fs2::FileExt::unlock(&file);
        if result.is_err() {
            return Map::new();
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                if !content.trim().is_empty() {
                    tracing::warn!("State file {} is corrupt, starting fresh", self.path.display());
                }
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Failed to open state file {}", self.path.display()))?;
        fs2::FileExt::lock_exclusive(&file)
            .context("Failed to lock state file for writing")?;
        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))?;
        let result = file
            .set_len(0)
            .and_then(|_| file.rewind())
            .and_then(|_| file.write_all(content.as_bytes()));
        let _ = fs2::FileExt::unlock(&file);
        result.with_context(|| format!("Failed to write state file {}", self.path.display()))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map()
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
