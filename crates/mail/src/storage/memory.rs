//! In-memory session storage
//!
//! Used for tests and for `DATABASE_URL=memory`, where sessions are allowed
//! to vanish on restart.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::SessionStore;
use crate::models::{Session, SessionId};

/// In-memory implementation of SessionStore
///
/// A HashMap protected by an RwLock for thread-safe access.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        self.write()?.insert(session.id.0.clone(), session.clone());
        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.read()?.get(id.as_str()).cloned())
    }

    fn find_pending_by_state(&self, csrf_state: &str) -> Result<Option<Session>> {
        Ok(self
            .read()?
            .values()
            .find(|s| s.csrf_state() == Some(csrf_state))
            .cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<bool> {
        Ok(self.write()?.remove(id.as_str()).is_some())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }

    fn count_authenticated(&self) -> Result<usize> {
        Ok(self.read()?.values().filter(|s| s.is_authenticated()).count())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
