//! Persistence of the current [`Session`].
//!
//! The session lives in a small key-value store under two keys,
//! [`TOKEN_KEY`] and [`USER_KEY`], which are always written and removed
//! together. Callers should go through [`SessionStore`] rather than touching
//! the keys directly.

use crate::{Session, User};
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

/// The key holding the raw bearer token.
pub const TOKEN_KEY: &str = "auth_token";
/// The key holding the JSON-serialized [`User`].
pub const USER_KEY: &str = "auth_user";

/// A string-to-string store where batched writes are applied as a unit.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write several entries in one batch.
    fn multi_set(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Remove several entries in one batch. Missing keys are ignored.
    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// Errors that may occur while reading or writing a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unable to access the session store")]
    Io(#[from] io::Error),
    #[error("The session store at \"{}\" is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unable to serialize the session")]
    Encode(#[from] serde_json::Error),
    #[error("Unable to replace the session store")]
    Persist(#[source] io::Error),
}

/// A [`KeyValueStore`] which only lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn multi_set(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = self.entries();

        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }

        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.entries();

        for key in keys {
            map.remove(*key);
        }

        Ok(())
    }
}

/// A [`KeyValueStore`] backed by a single JSON file.
///
/// All I/O is blocking. [`ApiClient`](crate::ApiClient) reads the token on
/// a blocking thread before each request.
///
/// Every batch rewrites the whole file through a temporary file in the same
/// directory which is then renamed over the original, so a batch is either
/// fully applied or not at all.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(HashMap::new())
            },
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the current entries before a write. A corrupt file is replaced
    /// rather than blocking every future login.
    fn read_for_update(&self) -> Result<HashMap<String, String>, StoreError> {
        match self.read_all() {
            Err(StoreError::Corrupt { path, source }) => {
                log::warn!(
                    "Discarding the corrupt session store at \"{}\": {}",
                    path.display(),
                    source
                );
                Ok(HashMap::new())
            },
            other => other,
        }
    }

    fn write_all(
        &self,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, entries)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::Persist(e.error))?;

        log::trace!("Wrote the session store to \"{}\"", self.path.display());

        Ok(())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.guard();
        let mut entries = self.read_all()?;

        Ok(entries.remove(key))
    }

    fn multi_set(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut map = self.read_for_update()?;

        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }

        self.write_all(&map)
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut map = self.read_for_update()?;
        let before = map.len();

        for key in keys {
            map.remove(*key);
        }

        if map.len() == before && !self.path.exists() {
            return Ok(());
        }

        self.write_all(&map)
    }
}

/// The one owner of the persisted [`Session`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new<S>(backend: S) -> Self
    where
        S: KeyValueStore + 'static,
    {
        SessionStore {
            backend: Arc::new(backend),
        }
    }

    /// A store which forgets everything when the process exits.
    pub fn in_memory() -> Self { SessionStore::new(MemoryStore::new()) }

    /// The persisted bearer token, if any.
    ///
    /// Read failures are logged and reported as "no token", since being
    /// unauthenticated is a perfectly normal state.
    pub fn token(&self) -> Option<String> {
        match self.backend.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Unable to read the stored token: {}", e);
                None
            },
        }
    }

    /// The persisted user profile, if any.
    pub fn user(&self) -> Option<User> {
        let json = match self.backend.get(USER_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Unable to read the stored user: {}", e);
                return None;
            },
        };

        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                log::warn!("Unable to parse the stored user: {}", e);
                None
            },
        }
    }

    /// The full session, only if both halves are present.
    pub fn load(&self) -> Option<Session> {
        match (self.token(), self.user()) {
            (Some(token), Some(user)) => Some(Session { token, user }),
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("Ignoring a partially stored session");
                None
            },
            (None, None) => None,
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let user = serde_json::to_string(&session.user)?;

        self.backend.multi_set(&[
            (TOKEN_KEY, session.token.as_str()),
            (USER_KEY, user.as_str()),
        ])
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.multi_remove(&[TOKEN_KEY, USER_KEY])
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}
