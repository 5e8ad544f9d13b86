use crate::error::ClientError;
use crate::models::Session;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CREDENTIAL_KEY: &str = "vs_credential";
pub const HAS_VOTED_KEY: &str = "vs_hasVoted";

// Key-value storage scoped to one voter session
pub trait Storage: Send {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove_item(&mut self, key: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), ClientError> {
        self.items.remove(key);
        Ok(())
    }
}

// One JSON object per session id, rewritten on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path, session_id: &str) -> Result<Self, ClientError> {
        fs::create_dir_all(dir)
            .map_err(|e| ClientError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;
        Ok(Self {
            path: dir.join(format!("{}.json", session_id)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Storage(format!("corrupt session file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ClientError::Storage(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(items)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&self.path, raw)
            .map_err(|e| ClientError::Storage(format!("cannot write {}: {}", self.path.display(), e)))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), ClientError> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// Persists the credential and has-voted flag for the current session.
///
/// Any storage failure switches the store to an in-memory map for the rest
/// of the process; callers never see the error.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    degraded: bool,
}

impl SessionStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            degraded: false,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::default()))
    }

    // Open file-backed storage, or fall back to memory if the directory is unusable
    pub fn open(dir: &Path, session_id: &str) -> Self {
        match FileStorage::new(dir, session_id) {
            Ok(storage) => {
                info!("Session storage at {}", storage.path().display());
                Self::new(Box::new(storage))
            }
            Err(e) => {
                warn!("{}; keeping the session in memory only", e);
                let mut store = Self::in_memory();
                store.degraded = true;
                store
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn save(&mut self, session: &Session) {
        let credential = session.credential.as_deref().unwrap_or("");
        let has_voted = if session.has_voted { "1" } else { "0" };

        let result = self
            .storage
            .set_item(CREDENTIAL_KEY, credential)
            .and_then(|_| self.storage.set_item(HAS_VOTED_KEY, has_voted));
        if let Err(e) = result {
            self.degrade(e);
            // Memory storage never fails
            let _ = self.storage.set_item(CREDENTIAL_KEY, credential);
            let _ = self.storage.set_item(HAS_VOTED_KEY, has_voted);
        }
    }

    pub fn load(&mut self) -> Session {
        let read = |storage: &dyn Storage| -> Result<Session, ClientError> {
            let credential = storage.get_item(CREDENTIAL_KEY)?.unwrap_or_default();
            let has_voted = storage.get_item(HAS_VOTED_KEY)?.as_deref() == Some("1");
            Ok(Session {
                credential: if credential.is_empty() { None } else { Some(credential) },
                has_voted,
            })
        };

        match read(self.storage.as_ref()) {
            Ok(session) => session,
            Err(e) => {
                self.degrade(e);
                Session::default()
            }
        }
    }

    pub fn clear(&mut self) {
        let result = self
            .storage
            .remove_item(CREDENTIAL_KEY)
            .and_then(|_| self.storage.remove_item(HAS_VOTED_KEY));
        if let Err(e) = result {
            self.degrade(e);
        }
    }

    fn degrade(&mut self, error: ClientError) {
        warn!("{}; keeping the session in memory only", error);
        self.storage = Box::new(MemoryStorage::default());
        self.degraded = true;
    }
}
