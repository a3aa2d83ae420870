//! Operator session: the bearer token and the "sound enabled" flag.
//!
//! Both survive restarts. They live in a small string-valued key-value JSON
//! file (`SessionStore`) and are read and written only through [`Session`]'s
//! typed accessors. Every write is persisted immediately.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::error::{WatchError, WatchResult};

pub const ENV_SESSION_PATH: &str = "SHOP_SESSION_PATH";

const KEY_TOKEN: &str = "token";
const KEY_SOUND: &str = "soundEnabled";

/// File-backed string map. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$SHOP_SESSION_PATH`, else `<config_dir>/shop/session.json`.
    pub fn default_path() -> WatchResult<PathBuf> {
        if let Ok(p) = std::env::var(ENV_SESSION_PATH) {
            if !p.trim().is_empty() {
                return Ok(PathBuf::from(p));
            }
        }
        let base = dirs::config_dir().ok_or_else(|| {
            WatchError::SessionIo(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no config directory; set {ENV_SESSION_PATH}"),
            ))
        })?;
        Ok(base.join("shop").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> WatchResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, values: &BTreeMap<String, String>) -> WatchResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

struct Inner {
    store: Option<SessionStore>,
    values: BTreeMap<String, String>,
}

/// Shared session context. Clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.lock();
        f.debug_struct("Session")
            .field("path", &g.store.as_ref().map(SessionStore::path))
            .field("token", &g.values.get(KEY_TOKEN).map(|_| "<REDACTED>"))
            .field("sound_enabled", &g.values.get(KEY_SOUND))
            .finish()
    }
}

impl Session {
    pub fn open(store: SessionStore) -> WatchResult<Self> {
        let values = store.load()?;
        Ok(Self::from_parts(Some(store), values))
    }

    pub fn open_default() -> WatchResult<Self> {
        Self::open(SessionStore::new(SessionStore::default_path()?))
    }

    /// Not persisted anywhere.
    pub fn in_memory() -> Self {
        Self::from_parts(None, BTreeMap::new())
    }

    fn from_parts(store: Option<SessionStore>, values: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { store, values })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, key: &str, value: Option<String>) -> WatchResult<()> {
        let mut g = self.lock();
        match value {
            Some(v) => g.values.insert(key.to_string(), v),
            None => g.values.remove(key),
        };
        match &g.store {
            Some(store) => store.save(&g.values),
            None => Ok(()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.lock()
            .values
            .get(KEY_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .cloned()
    }

    pub fn set_token(&self, token: &str) -> WatchResult<()> {
        self.write(KEY_TOKEN, Some(token.to_string()))
    }

    pub fn clear_token(&self) -> WatchResult<()> {
        self.write(KEY_TOKEN, None)
    }

    pub fn sound_enabled(&self) -> bool {
        self.lock()
            .values
            .get(KEY_SOUND)
            .is_some_and(|v| v == "true")
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> WatchResult<()> {
        self.write(KEY_SOUND, Some(enabled.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let s = Session::open(SessionStore::new(&path)).unwrap();
        assert_eq!(s.token(), None);
        assert!(!s.sound_enabled());
        s.set_token("abc").unwrap();
        s.set_sound_enabled(true).unwrap();

        let reopened = Session::open(SessionStore::new(&path)).unwrap();
        assert_eq!(reopened.token().as_deref(), Some("abc"));
        assert!(reopened.sound_enabled());

        reopened.clear_token().unwrap();
        let again = Session::open(SessionStore::new(&path)).unwrap();
        assert_eq!(again.token(), None);
        assert!(again.sound_enabled());
    }

    #[test]
    fn stored_values_are_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let s = Session::open(SessionStore::new(&path)).unwrap();
        s.set_sound_enabled(false).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["soundEnabled"], "false");
    }

    #[test]
    fn debug_redacts_token() {
        let s = Session::in_memory();
        s.set_token("super-secret").unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
