//! Credential provider
//!
//! Synchronous key-value access to the single Gemini API key.
//! The file-backed store survives process restarts.

use crate::error::AnalysisError;
use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Fixed slot the API key lives under
pub const GEMINI_API_KEY_SLOT: &str = "geminiApiKey";

/// Trait for credential persistence
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read the API key, treating blank values as absent
pub fn api_key(store: &dyn CredentialStore) -> Result<Option<String>> {
    Ok(store
        .get(GEMINI_API_KEY_SLOT)?
        .filter(|key| !key.trim().is_empty()))
}

fn poisoned<T>(_: T) -> AnalysisError {
    AnalysisError::CredentialStore("credential lock poisoned".to_string())
}

/// In-memory credential store for development and tests
pub struct InMemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.write() {
            values.insert(GEMINI_API_KEY_SLOT.to_string(), key.into());
        }
        store
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file credential store
///
/// The whole map is rewritten on every `set`; writes go through a temp
/// file and rename so a crash never leaves a half-written file.
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileCredentialStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = load_map(&path)?;

        debug!(path = %path.display(), entries = cache.len(), "Credential store opened");

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_map(path: &Path) -> Result<HashMap<String, String>> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            AnalysisError::CredentialStore(format!(
                "corrupt credential file {}: {}",
                path.display(),
                e
            ))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.cache.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.cache.write().map_err(poisoned)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)?;

        info!(path = %self.path.display(), key, "Credential saved");
        Ok(())
    }
}
