//! The session store: loads, caches, and persists session records.
//!
//! Layout on disk, one directory per session under the store root:
//!
//! ```text
//! <root>/<session_id>/state.json     — the full SessionState record
//! <root>/<session_id>/events.ndjson  — audit journal, one JSON entry per line
//! ```
//!
//! # Concurrency note
//!
//! The store's own map is guarded by a short-lived `std::sync::Mutex` that is
//! never held across an await. The per-session `tokio::sync::Mutex` inside
//! [`SessionHandle`] is the coarse per-session lock the whole core relies on:
//! hold it for the duration of one mutating call, and never while waiting on
//! another session's lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use parlor_protocol::SessionId;

use crate::error::StoreError;
use crate::events::{EventRecord, hex_token};
use crate::model::SessionState;

const STATE_FILENAME: &str = "state.json";
const EVENTS_FILENAME: &str = "events.ndjson";

/// Hands out per-session handles, creating or loading records on demand.
pub struct SessionStore {
    root: PathBuf,
    sessions: Mutex<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl SessionStore {
    /// Opens a store rooted at the given directory. The directory is created
    /// lazily on first save.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the handle for `session_id`, loading it from disk or creating
    /// a fresh record if none exists yet.
    pub fn get_or_create(&self, session_id: &SessionId) -> Arc<SessionHandle> {
        let mut sessions = self.sessions.lock().expect("session map lock");
        if let Some(handle) = sessions.get(session_id) {
            return Arc::clone(handle);
        }

        let dir = self.root.join(session_id.as_str());
        let state = load_state(&dir, session_id);
        let handle = Arc::new(SessionHandle {
            id: session_id.clone(),
            dir,
            state: tokio::sync::Mutex::new(state),
        });
        sessions.insert(session_id.clone(), Arc::clone(&handle));
        tracing::info!(session_id = %session_id, "session loaded");
        handle
    }

    /// Creates a brand-new session with a generated id and persists it.
    pub fn create(&self) -> Result<Arc<SessionHandle>, StoreError> {
        let session_id = SessionId::new(hex_token());
        let handle = self.get_or_create(&session_id);
        handle.save_state(&SessionState::new(session_id))?;
        Ok(handle)
    }

    /// Facilitator reset: replaces the in-memory and on-disk record with a
    /// fresh one, keeping the same session id.
    pub async fn reset(&self, session_id: &SessionId) -> Result<Arc<SessionHandle>, StoreError> {
        let handle = self.get_or_create(session_id);
        {
            let mut state = handle.lock().await;
            *state = SessionState::new(session_id.clone());
            handle.save(&state)?;
        }
        tracing::info!(%session_id, "session reset");
        Ok(handle)
    }

    /// Session ids currently cached in memory.
    pub fn loaded_session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .lock()
            .expect("session map lock")
            .keys()
            .cloned()
            .collect()
    }

    /// Session ids known to this store: cached plus on-disk directories.
    pub fn all_session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.loaded_session_ids();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    let id = SessionId::new(name);
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    /// Finds the session whose join code matches, case-insensitively.
    pub async fn find_by_join_code(&self, join_code: &str) -> Option<SessionId> {
        let code = join_code.trim().to_uppercase();
        if code.is_empty() {
            return None;
        }
        for id in self.all_session_ids() {
            let handle = self.get_or_create(&id);
            let state = handle.lock().await;
            if let Some(stored) = &state.join_code {
                if stored.to_uppercase() == code {
                    return Some(id);
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// A cached, lockable session record.
pub struct SessionHandle {
    id: SessionId,
    dir: PathBuf,
    state: tokio::sync::Mutex<SessionState>,
}

impl SessionHandle {
    /// The session this handle belongs to.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Acquires the per-session lock.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Persists the given state snapshot (record + journal).
    ///
    /// A failed save is reported to the caller but leaves the in-memory
    /// record untouched; callers log and carry on.
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        self.save_state(state)
    }

    fn save_state(&self, state: &SessionState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(state).map_err(StoreError::Serialize)?;
        write_atomic(&self.dir.join(STATE_FILENAME), json.as_bytes())?;

        let mut journal = String::new();
        for event in &state.events {
            journal.push_str(&serde_json::to_string(event).map_err(StoreError::Serialize)?);
            journal.push('\n');
        }
        write_atomic(&self.dir.join(EVENTS_FILENAME), journal.as_bytes())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Disk helpers
// ---------------------------------------------------------------------------

/// Writes through a sibling temp file and rename, so a crash mid-write never
/// leaves a torn record at the target path.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

fn load_state(dir: &Path, session_id: &SessionId) -> SessionState {
    let state_path = dir.join(STATE_FILENAME);
    let mut state = match fs::read_to_string(&state_path) {
        Ok(json) => match serde_json::from_str::<SessionState>(&json) {
            Ok(state) => state,
            Err(error) => {
                tracing::error!(%session_id, %error, "corrupt state.json, starting fresh");
                SessionState::new(session_id.clone())
            }
        },
        Err(_) => SessionState::new(session_id.clone()),
    };

    state.events = load_events(&dir.join(EVENTS_FILENAME));
    // The record on disk may predate this handle's id (manual copies).
    state.session_id = session_id.clone();
    state
}

fn load_events(path: &Path) -> Vec<EventRecord> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::PlayerId;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::open(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_handle_for_same_id() {
        let (_dir, store) = store();
        let a = store.get_or_create(&SessionId::new("s1"));
        let b = store.get_or_create(&SessionId::new("s1"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_save_then_reload_round_trips_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = SessionId::new("s1");

        {
            let store = SessionStore::open(dir.path());
            let handle = store.get_or_create(&id);
            let mut state = handle.lock().await;
            state.join_code = Some("MANOR".into());
            state.add_player(PlayerId::new("a"), "Ada");
            handle.save(&state).unwrap();
        }

        // A second store instance simulates a process restart.
        let store = SessionStore::open(dir.path());
        let handle = store.get_or_create(&id);
        let state = handle.lock().await;
        assert_eq!(state.join_code.as_deref(), Some("MANOR"));
        assert_eq!(state.players.len(), 1);
        // The journal came back from events.ndjson.
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events[0].kind, "player_join");
    }

    #[tokio::test]
    async fn test_reset_clears_record_but_keeps_id() {
        let (_dir, store) = store();
        let id = SessionId::new("s1");
        let handle = store.get_or_create(&id);
        {
            let mut state = handle.lock().await;
            state.add_player(PlayerId::new("a"), "Ada");
            handle.save(&state).unwrap();
        }

        let handle = store.reset(&id).await.unwrap();
        let state = handle.lock().await;
        assert!(state.players.is_empty());
        assert_eq!(state.session_id, id);
    }

    #[tokio::test]
    async fn test_find_by_join_code_is_case_insensitive() {
        let (_dir, store) = store();
        let id = SessionId::new("s1");
        let handle = store.get_or_create(&id);
        {
            let mut state = handle.lock().await;
            state.join_code = Some("Manor".into());
            handle.save(&state).unwrap();
        }

        assert_eq!(store.find_by_join_code("mAnOr").await, Some(id));
        assert_eq!(store.find_by_join_code("CELLAR").await, None);
        assert_eq!(store.find_by_join_code("  ").await, None);
    }

    #[tokio::test]
    async fn test_all_session_ids_sees_disk_sessions() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = SessionStore::open(dir.path());
            let handle = store.get_or_create(&SessionId::new("s1"));
            let state = handle.lock().await;
            handle.save(&state).unwrap();
        }

        let store = SessionStore::open(dir.path());
        assert_eq!(store.loaded_session_ids().len(), 0);
        assert_eq!(store.all_session_ids(), vec![SessionId::new("s1")]);
    }

    #[tokio::test]
    async fn test_corrupt_state_file_falls_back_to_fresh_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session_dir = dir.path().join("s1");
        fs::create_dir_all(&session_dir).unwrap();
        fs::write(session_dir.join(STATE_FILENAME), b"{ not json").unwrap();

        let store = SessionStore::open(dir.path());
        let handle = store.get_or_create(&SessionId::new("s1"));
        let state = handle.lock().await;
        assert_eq!(state.session_id, SessionId::new("s1"));
        assert!(state.players.is_empty());
    }
}
