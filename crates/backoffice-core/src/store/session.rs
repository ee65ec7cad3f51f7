// ── Session persistence ──
//
// The signed-in payload lives under a single key so that both binaries
// share one sign-in. `SessionHandle` keeps the loaded session in memory
// and answers the API client's per-request token lookups.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use backoffice_api::TokenProvider;
use secrecy::SecretString;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;
use crate::model::Session;

/// Storage key of the signed-in payload.
pub const SESSION_KEY: &str = "backoffice.session";

/// Where the signed-in payload is persisted between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, CoreError>;
    fn save(&self, session: &Session) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

fn storage_error(action: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Session {
        message: format!("failed to {action} session: {err}"),
    }
}

// ── File ─────────────────────────────────────────────────────────────

/// A JSON object on disk with the payload under [`SESSION_KEY`].
/// Other keys in the file are preserved.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, CoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| storage_error("read", e))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw).map_err(|e| storage_error("parse", e))? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn write_map(&self, map: Map<String, Value>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error("write", e))?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| storage_error("encode", e))?;
        std::fs::write(&self.path, body).map_err(|e| storage_error("write", e))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, CoreError> {
        Ok(self
            .read_map()?
            .remove(SESSION_KEY)
            .filter(|v| !v.is_null())
            .map(Session::new))
    }

    fn save(&self, session: &Session) -> Result<(), CoreError> {
        let mut map = self.read_map()?;
        map.insert(SESSION_KEY.to_owned(), session.payload().clone());
        self.write_map(map)
    }

    fn clear(&self) -> Result<(), CoreError> {
        let mut map = self.read_map()?;
        if map.remove(SESSION_KEY).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            return std::fs::remove_file(&self.path).map_err(|e| storage_error("remove", e));
        }
        self.write_map(map)
    }
}

// ── Keyring ──────────────────────────────────────────────────────────

/// OS keyring entry `{service}` / `{profile}/backoffice.session`.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
    user: String,
}

impl KeyringSessionStore {
    pub fn new(service: impl Into<String>, profile: &str) -> Self {
        Self {
            service: service.into(),
            user: format!("{profile}/{SESSION_KEY}"),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service, &self.user).map_err(|e| storage_error("open", e))
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<Session>, CoreError> {
        match self.entry()?.get_password() {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| storage_error("parse", e)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(storage_error("read", e)),
        }
    }

    fn save(&self, session: &Session) -> Result<(), CoreError> {
        let raw = serde_json::to_string(session).map_err(|e| storage_error("encode", e))?;
        self.entry()?
            .set_password(&raw)
            .map_err(|e| storage_error("write", e))
    }

    fn clear(&self) -> Result<(), CoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(storage_error("remove", e)),
        }
    }
}

// ── Memory ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), CoreError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ── Handle ───────────────────────────────────────────────────────────

/// In-memory view of the persisted session.
pub struct SessionHandle {
    store: Arc<dyn SessionStore>,
    current: ArcSwapOption<Session>,
}

impl SessionHandle {
    /// Load whatever session the store already holds.
    pub fn load(store: Arc<dyn SessionStore>) -> Result<Self, CoreError> {
        let current = store.load()?.map(Arc::new);
        debug!(signed_in = current.is_some(), "session loaded");
        Ok(Self {
            store,
            current: ArcSwapOption::new(current),
        })
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some_and(|s| s.token().is_some())
    }

    /// Persist and activate a new session.
    pub fn set(&self, session: Session) -> Result<(), CoreError> {
        self.store.save(&session)?;
        self.current.store(Some(Arc::new(session)));
        Ok(())
    }

    /// Forget the session. The in-memory copy is dropped even when the
    /// backing store fails to clear.
    pub fn clear(&self) -> Result<(), CoreError> {
        self.current.store(None);
        self.store.clear()
    }
}

impl TokenProvider for SessionHandle {
    fn bearer_token(&self) -> Option<SecretString> {
        self.current().and_then(|s| s.token())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn file_store_round_trips_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let session = Session::new(json!({"token": "abc", "user": {"name": "Omar"}}));
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        let left: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(left, json!({"theme": "dark"}));
    }

    #[test]
    fn file_store_removes_file_when_only_session_was_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileSessionStore::new(&path);
        store.save(&Session::new(json!({"token": "t"}))).unwrap();
        assert!(path.exists());
        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn handle_serves_token_and_forgets_on_clear() {
        let store = Arc::new(MemorySessionStore::new());
        let handle = SessionHandle::load(store.clone()).unwrap();
        assert!(handle.bearer_token().is_none());

        handle
            .set(Session::new(json!({"data": {"token": "xyz"}})))
            .unwrap();
        assert_eq!(handle.bearer_token().unwrap().expose_secret(), "xyz");
        assert!(store.load().unwrap().is_some());

        handle.clear().unwrap();
        assert!(!handle.is_signed_in());
        assert!(store.load().unwrap().is_none());
    }
}
