//! Session storage backends and change notifications.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::{SessionError, SessionToken};
use crate::api::types::UserProfile;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";
const EVENT_CAPACITY: usize = 64;

/// Which persisted entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// The token cookie.
    Cookie,
    /// The local token entry.
    Token,
    /// The local cached user profile.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageChange {
    Set,
    Removed,
}

/// Notification that persisted session state changed.
///
/// Delivered to every handle sharing the same store, including the one that
/// made the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageEvent {
    pub key: StorageKey,
    pub change: StorageChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: DateTime<Utc>,
}

/// On-disk shape of the session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    cookies: BTreeMap<String, StoredCookie>,
    #[serde(default)]
    local: BTreeMap<String, String>,
}

enum Backend {
    Memory(Mutex<Document>),
    File { path: PathBuf, lock: Mutex<()> },
}

impl Backend {
    fn load(&self) -> Result<Document, SessionError> {
        match self {
            Self::Memory(doc) => doc.lock().map(|doc| doc.clone()).map_err(|_| SessionError::Poisoned),
            Self::File { path, .. } => read_document(path),
        }
    }

    /// Read-modify-write under the backend lock.
    fn update(&self, apply: impl FnOnce(&mut Document)) -> Result<(), SessionError> {
        match self {
            Self::Memory(doc) => {
                let mut doc = doc.lock().map_err(|_| SessionError::Poisoned)?;
                apply(&mut doc);
                Ok(())
            }
            Self::File { path, lock } => {
                let _guard = lock.lock().map_err(|_| SessionError::Poisoned)?;
                let mut doc = read_document(path)?;
                apply(&mut doc);
                write_document(path, &doc)
            }
        }
    }
}

fn read_document(path: &Path) -> Result<Document, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(Document::default()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write via a temp file in the same directory, then rename over the target.
fn write_document(path: &Path, doc: &Document) -> Result<(), SessionError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Handle to persisted session state.
///
/// Clones share the backend and the change channel, so a clone behaves like
/// another tab of the same browser profile.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    backend: Backend,
    cookie_ttl: TimeDelta,
    events: broadcast::Sender<StorageEvent>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.inner.backend {
            Backend::Memory(_) => "memory".to_string(),
            Backend::File { path, .. } => path.display().to_string(),
        };
        f.debug_struct("SessionStore")
            .field("backend", &backend)
            .field("cookie_ttl", &self.inner.cookie_ttl)
            .finish()
    }
}

impl SessionStore {
    fn with_backend(backend: Backend, cookie_ttl: TimeDelta) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionStoreInner {
                backend,
                cookie_ttl,
                events,
            }),
        }
    }

    /// Store backed by a JSON file. Nothing is read until first use; a missing
    /// file is an empty session.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, cookie_ttl: TimeDelta) -> Self {
        Self::with_backend(
            Backend::File {
                path: path.into(),
                lock: Mutex::new(()),
            },
            cookie_ttl,
        )
    }

    /// Store that lives only as long as its handles.
    #[must_use]
    pub fn in_memory(cookie_ttl: TimeDelta) -> Self {
        Self::with_backend(Backend::Memory(Mutex::new(Document::default())), cookie_ttl)
    }

    /// Receive every subsequent storage change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    fn publish(&self, key: StorageKey, change: StorageChange) {
        // No subscribers is fine.
        let _ = self.inner.events.send(StorageEvent { key, change });
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The cookie token, ignoring an expired cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    pub fn cookie_token(&self) -> Result<Option<SessionToken>, SessionError> {
        let now = Utc::now();
        Ok(self
            .inner
            .backend
            .load()?
            .cookies
            .remove(TOKEN_KEY)
            .filter(|cookie| cookie.expires_at > now && !cookie.value.is_empty())
            .map(|cookie| SessionToken::from(cookie.value)))
    }

    /// The local token entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    pub fn local_token(&self) -> Result<Option<SessionToken>, SessionError> {
        Ok(self
            .inner
            .backend
            .load()?
            .local
            .remove(TOKEN_KEY)
            .filter(|value| !value.is_empty())
            .map(SessionToken::from))
    }

    /// The session token: the cookie if live, else the local entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    pub fn token(&self) -> Result<Option<SessionToken>, SessionError> {
        match self.cookie_token()? {
            Some(token) => Ok(Some(token)),
            None => self.local_token(),
        }
    }

    /// The cached profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read or the cached
    /// profile is corrupt.
    pub fn user(&self) -> Result<Option<UserProfile>, SessionError> {
        self.inner
            .backend
            .load()?
            .local
            .get(USER_KEY)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(SessionError::from)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Persist a new session into both stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    #[instrument(skip_all)]
    pub fn save_session(
        &self,
        token: &SecretString,
        user: Option<&UserProfile>,
    ) -> Result<(), SessionError> {
        let value = token.expose_secret().to_string();
        let user_json = user.map(serde_json::to_string).transpose()?;
        let expires_at = Utc::now() + self.inner.cookie_ttl;

        self.inner.backend.update(|doc| {
            doc.cookies.insert(
                TOKEN_KEY.to_string(),
                StoredCookie {
                    value: value.clone(),
                    expires_at,
                },
            );
            doc.local.insert(TOKEN_KEY.to_string(), value);
            if let Some(user_json) = &user_json {
                doc.local.insert(USER_KEY.to_string(), user_json.clone());
            }
        })?;

        debug!(%expires_at, "Session saved");
        self.publish(StorageKey::Cookie, StorageChange::Set);
        self.publish(StorageKey::Token, StorageChange::Set);
        if user_json.is_some() {
            self.publish(StorageKey::User, StorageChange::Set);
        }
        Ok(())
    }

    /// Replace the cached user profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    pub fn save_user(&self, user: &UserProfile) -> Result<(), SessionError> {
        let user_json = serde_json::to_string(user)?;
        self.inner.backend.update(|doc| {
            doc.local.insert(USER_KEY.to_string(), user_json);
        })?;
        self.publish(StorageKey::User, StorageChange::Set);
        Ok(())
    }

    /// Remove the session from both stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    #[instrument(skip_all)]
    pub fn clear(&self) -> Result<(), SessionError> {
        self.inner.backend.update(|doc| {
            doc.cookies.remove(TOKEN_KEY);
            doc.local.remove(TOKEN_KEY);
            doc.local.remove(USER_KEY);
        })?;

        debug!("Session cleared");
        self.publish(StorageKey::Cookie, StorageChange::Removed);
        self.publish(StorageKey::Token, StorageChange::Removed);
        self.publish(StorageKey::User, StorageChange::Removed);
        Ok(())
    }
}
