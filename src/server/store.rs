//! Session storage and management.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::session::PtySession;
use crate::error::TtyShareError;
use crate::Result;

/// Thread-safe storage for running sessions, keyed by session id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<PtySession>>>,
}

impl SessionStore {
    /// Create a new empty session store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the session with the given id.
    pub fn get(&self, id: &str) -> Result<Option<Arc<PtySession>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TtyShareError::LockPoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    /// Add a session. Fails if the id is taken.
    pub fn insert(&self, session: Arc<PtySession>) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TtyShareError::LockPoisoned)?;

        if sessions.contains_key(session.id()) {
            return Err(TtyShareError::SessionExists(session.id().to_string()));
        }
        sessions.insert(session.id().to_string(), session);
        Ok(())
    }

    /// Attach a receiver to the session with the given id, creating it with
    /// `create` if absent or exited. Returns the session and its receiver
    /// count.
    ///
    /// The write lock is held while `create` runs and while the receiver is
    /// counted, so concurrent callers for the same id end up sharing one
    /// session, and a session [`SessionStore::detach`] has let go of is never
    /// handed out again.
    pub fn attach_or_insert_with<F>(
        &self,
        id: &str,
        create: F,
    ) -> Result<(Arc<PtySession>, usize)>
    where
        F: FnOnce() -> Result<Arc<PtySession>>,
    {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TtyShareError::LockPoisoned)?;

        if let Some(session) = sessions.get(id) {
            if !session.has_exited() {
                let receivers = session.attach();
                return Ok((Arc::clone(session), receivers));
            }
        }

        let session = create()?;
        let receivers = session.attach();
        sessions.insert(id.to_string(), Arc::clone(&session));
        Ok((session, receivers))
    }

    /// Detach a receiver from `session`. Returns the remaining count.
    ///
    /// When the last receiver leaves, the session is removed under the same
    /// lock, so no new receiver can attach to it afterwards. The caller
    /// decides whether to stop the command.
    pub fn detach(&self, session: &Arc<PtySession>) -> Result<usize> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TtyShareError::LockPoisoned)?;

        let remaining = session.detach();
        if remaining == 0 {
            if let Some(stored) = sessions.get(session.id()) {
                if Arc::ptr_eq(stored, session) {
                    sessions.remove(session.id());
                }
            }
        }
        Ok(remaining)
    }

    /// Remove `session` if it is still the one stored under its id.
    ///
    /// Returns whether it was removed. A newer session that reuses the id is
    /// left alone.
    pub fn remove(&self, session: &Arc<PtySession>) -> Result<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TtyShareError::LockPoisoned)?;

        match sessions.get(session.id()) {
            Some(stored) if Arc::ptr_eq(stored, session) => {
                sessions.remove(session.id());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Ids of all stored sessions, sorted.
    pub fn list_ids(&self) -> Result<Vec<String>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TtyShareError::LockPoisoned)?;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Get the number of stored sessions.
    pub fn count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TtyShareError::LockPoisoned)?;
        Ok(sessions.len())
    }

    /// Remove every session and kill its command.
    pub fn stop_all(&self) -> Result<usize> {
        let drained: Vec<Arc<PtySession>> = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|_| TtyShareError::LockPoisoned)?;
            sessions.drain().map(|(_, session)| session).collect()
        };

        for session in &drained {
            session.stop();
        }
        Ok(drained.len())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
