//! Session Store: the single piece of shared mutable state.
//!
//! Holds the current opaque session id and persists it under one well-known
//! key so it survives restarts, the way the browser console keeps it in local
//! storage. Readers (the resource client) go through the public accessors;
//! the mutating methods are crate-private and only the session controller
//! calls them.

use crate::app::errors::{ConsoleError, ConsoleResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Well-known key the session id is persisted under
pub const SESSION_KEY: &str = "x_session_id";

/// An active role-assumption session.
///
/// The id is opaque and is the sole credential artifact; `Debug` only shows
/// a prefix of it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    expiration: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expiration: None,
        }
    }

    pub fn with_expiration(mut self, expiration: Option<DateTime<Utc>>) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Expiration reported by the backend at login, if any. Not known for
    /// sessions restored from disk.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Prefix of the id, safe to log
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &format!("{}...", self.short_id()))
            .field("expiration", &self.expiration)
            .finish()
    }
}

pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Key/value persistence behind the store
pub trait SessionPersistence: Send + Sync + fmt::Debug {
    fn load(&self, key: &str) -> ConsoleResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> ConsoleResult<()>;
    fn remove(&self, key: &str) -> ConsoleResult<()>;
}

/// JSON object file, one entry per key
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> ConsoleResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ConsoleError::Storage(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ConsoleError::Storage(format!("corrupt session file {}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> ConsoleResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConsoleError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| {
            ConsoleError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        // The session id is a bearer credential: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
            {
                warn!("Failed to restrict session file permissions: {}", e);
            }
        }

        Ok(())
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self, key: &str) -> ConsoleResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> ConsoleResult<()> {
        let mut entries = self.read_all().unwrap_or_else(|e| {
            warn!("Discarding unreadable session file: {}", e);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> ConsoleResult<()> {
        match self.read_all() {
            Ok(mut entries) => {
                if entries.remove(key).is_none() {
                    return Ok(());
                }
                self.write_all(&entries)
            }
            Err(e) => {
                warn!("Discarding unreadable session file: {}", e);
                self.write_all(&BTreeMap::new())
            }
        }
    }
}

/// Process-local persistence, forgotten when the process exits
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ConsoleResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| ConsoleError::Storage(format!("memory store poisoned: {}", e)))
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self, key: &str) -> ConsoleResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> ConsoleResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ConsoleResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    persistence: Box<dyn SessionPersistence>,
}

impl SessionStore {
    /// Open a store, restoring any persisted session id.
    ///
    /// An unreadable session file is treated as no session; the next login
    /// or logout overwrites it.
    pub fn open(persistence: Box<dyn SessionPersistence>) -> Self {
        let restored = match persistence.load(SESSION_KEY) {
            Ok(id) => id.filter(|id| !id.trim().is_empty()).map(Session::new),
            Err(e) => {
                warn!("Ignoring persisted session: {}", e);
                None
            }
        };

        if let Some(session) = &restored {
            debug!("Restored persisted session {}...", session.short_id());
        }

        Self {
            current: RwLock::new(restored),
            persistence,
        }
    }

    /// A store that forgets its session when the process exits
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            persistence: Box::new(MemoryPersistence::new()),
        }
    }

    pub fn current(&self) -> Option<Session> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.current().map(|s| s.id)
    }

    pub fn is_present(&self) -> bool {
        self.current().is_some()
    }

    /// Replace the current session, then run `then` under the write lock.
    ///
    /// Persisted first so a failed write leaves the store unchanged and
    /// `then` is not run.
    pub(crate) fn store<F: FnOnce()>(&self, session: Session, then: F) -> ConsoleResult<()> {
        let mut guard = self.write_guard();
        self.persistence.save(SESSION_KEY, &session.id)?;
        *guard = Some(session);
        then();
        Ok(())
    }

    /// Remove the current session unconditionally and run `then` under the
    /// write lock.
    ///
    /// The in-memory session is gone and `then` has run even when the
    /// persisted copy could not be removed; that failure is still returned.
    pub(crate) fn clear<F: FnOnce()>(&self, then: F) -> ConsoleResult<()> {
        let mut guard = self.write_guard();
        *guard = None;
        then();
        self.persistence.remove(SESSION_KEY)
    }

    /// Remove the current session only if it is still `session_id`, running
    /// `on_cleared` under the same write lock.
    ///
    /// Returns true if this call cleared it. Concurrent callers rejecting the
    /// same id clear it exactly once, and a rejection of an old id never
    /// clears a newer session.
    pub(crate) fn clear_if_current<F: FnOnce()>(&self, session_id: &str, on_cleared: F) -> bool {
        let mut guard = self.write_guard();
        match guard.as_ref() {
            Some(current) if current.id == session_id => {
                *guard = None;
                on_cleared();
                if let Err(e) = self.persistence.remove(SESSION_KEY) {
                    warn!("Session cleared in memory but not on disk: {}", e);
                }
                true
            }
            _ => false,
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
