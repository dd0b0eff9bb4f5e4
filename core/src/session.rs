//! Session store: the current user id and session token.
//!
//! # Design
//! The store is the only mutable state shared between concurrent calls. Both
//! fields sit behind one `RwLock`, so `set_credentials` publishes id and token
//! together and readers see either the old or the new pair, never a mix.
//! Nothing here clears a session once set.
//!
//! When built with `persistent`, the pair is mirrored to a JSON file
//! (0600 on Unix) whenever both halves are present. Persistence failures are
//! logged and do not affect the in-memory value.
//!
//! Saving runs synchronously under the write lock, so the file follows update
//! order. It blocks the caller's thread; in `ServiceClient` that happens once
//! per session, when the bootstrap leader stores the new credentials.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Snapshot of the session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Session {
    /// True iff both the user id and the token are present and non-empty.
    pub fn is_logged_in(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.user_id) && present(&self.token)
    }
}

/// Process-wide session state, shared by reference between client instances.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<Session>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// An empty, in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store mirrored to `path`. An existing, readable file seeds the
    /// initial state; a missing or malformed one starts logged out.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_session(&path).unwrap_or_default();
        Self {
            state: RwLock::new(state),
            path: Some(path),
        }
    }

    /// Default location of the session file under the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("events-core/session.json"))
    }

    pub fn user_id(&self) -> Option<String> {
        self.snapshot().user_id
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token
    }

    pub fn is_logged_in(&self) -> bool {
        self.snapshot().is_logged_in()
    }

    /// Consistent copy of both fields.
    pub fn snapshot(&self) -> Session {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The token, but only when the session is fully logged in.
    pub fn logged_in_token(&self) -> Option<String> {
        let session = self.snapshot();
        if session.is_logged_in() {
            session.token
        } else {
            None
        }
    }

    pub fn set_user_id(&self, user_id: impl Into<String>) {
        self.update(|session| session.user_id = Some(user_id.into()));
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.update(|session| session.token = Some(token.into()));
    }

    /// Write id and token as one step.
    pub fn set_credentials(&self, user_id: impl Into<String>, token: impl Into<String>) {
        let user_id = user_id.into();
        let token = token.into();
        self.update(|session| {
            session.user_id = Some(user_id);
            session.token = Some(token);
        });
    }

    fn update(&self, apply: impl FnOnce(&mut Session)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
        if let Some(path) = &self.path {
            if guard.is_logged_in() {
                if let Err(err) = save_session(path, &guard) {
                    tracing::warn!(path = %path.display(), "failed to persist session: {err}");
                }
            }
        }
    }
}

fn load_session(path: &Path) -> Option<Session> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(session) => Some(session),
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring malformed session file: {err}");
            None
        }
    }
}

fn save_session(path: &Path, session: &Session) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_logged_out() {
        let store = SessionStore::new();
        assert!(!store.is_logged_in());
        assert!(store.user_id().is_none());
        assert!(store.token().is_none());
        assert!(store.logged_in_token().is_none());
    }

    #[test]
    fn needs_both_fields_to_be_logged_in() {
        let store = SessionStore::new();
        store.set_user_id("1");
        assert!(!store.is_logged_in());
        store.set_token("tok");
        assert!(store.is_logged_in());
        assert_eq!(store.logged_in_token().as_deref(), Some("tok"));
    }

    #[test]
    fn empty_values_are_not_logged_in() {
        let store = SessionStore::new();
        store.set_credentials("", "tok");
        assert!(!store.is_logged_in());
        store.set_credentials("1", "");
        assert!(!store.is_logged_in());
    }

    #[test]
    fn concurrent_readers_see_whole_pairs() {
        let store = Arc::new(SessionStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    store.set_credentials(format!("user-{i}"), format!("token-{i}"));
                }
            })
        };
        for _ in 0..500 {
            let snapshot = store.snapshot();
            if let (Some(id), Some(token)) = (snapshot.user_id, snapshot.token) {
                assert_eq!(id.trim_start_matches("user-"), token.trim_start_matches("token-"));
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn persistent_store_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        let store = SessionStore::persistent(&path);
        assert!(!store.is_logged_in());
        store.set_user_id("9");
        assert!(!path.exists(), "half a session must not be written");
        store.set_token("secret");
        assert!(path.exists());

        let reloaded = SessionStore::persistent(&path);
        assert_eq!(reloaded.user_id().as_deref(), Some("9"));
        assert_eq!(reloaded.token().as_deref(), Some("secret"));
    }

    #[test]
    fn concurrent_writers_leave_latest_pair_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = Arc::new(SessionStore::persistent(&path));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.set_credentials(format!("user-{w}-{i}"), format!("token-{w}-{i}"));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(SessionStore::persistent(&path).snapshot(), store.snapshot());
    }

    #[test]
    fn malformed_session_file_starts_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SessionStore::persistent(&path);
        assert!(!store.is_logged_in());
    }
}
