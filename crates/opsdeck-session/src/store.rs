//! Durable token storage.
//!
//! The session persists exactly one opaque token. [`TokenStore`] is the seam:
//! production uses the file-backed store under the platform config directory,
//! tests plug in the in-memory store.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Filename of the persisted session document.
const SESSION_FILE: &str = "session.json";

/// Directory under the platform config root.
const APP_DIR: &str = "opsdeck";

/// Durable storage for the single session token.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token. `Ok(None)` when none is stored.
    fn load(&self) -> Result<Option<String>>;

    /// Persist the token, replacing any previous one.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the persisted token. Removing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<()> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// On-disk shape of the session document.
#[derive(Debug, Serialize, Deserialize)]
struct SessionDocument {
    token: String,
}

/// File-backed token store: a small JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location
    /// (`<config dir>/opsdeck/session.json`).
    pub fn default_path() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::store("could not determine config directory for this platform"))?;
        Ok(Self::new(config_dir.join(APP_DIR).join(SESSION_FILE)))
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::store(format!("{}: {e}", self.path.display())))?;
        let document: SessionDocument = serde_json::from_str(&content)
            .map_err(|e| Error::store(format!("invalid session document: {e}")))?;
        Ok(Some(document.token))
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::store(format!("{}: {e}", parent.display())))?;
        }
        let document = SessionDocument {
            token: token.to_string(),
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::store(format!("failed to serialize session: {e}")))?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::store(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::store(format!("{}: {e}", self.path.display()))),
        }
    }
}

/// In-memory token store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if a previous session had saved one.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
