//! Storage trait definitions

use crate::models::{Session, SessionId};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Trait for session storage operations
///
/// Abstracts over the in-memory and SQLite backends. Implementations are
/// shared across request handlers and must synchronize internally.
pub trait SessionStore: Send + Sync {
    /// Insert or replace a session
    fn save(&self, session: &Session) -> Result<()>;

    /// Get a session by ID, whatever its state or expiry
    fn get(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Find the pending session waiting for the given OAuth `state`
    fn find_pending_by_state(&self, csrf_state: &str) -> Result<Option<Session>>;

    /// Remove a session; returns whether it existed
    fn remove(&self, id: &SessionId) -> Result<bool>;

    /// Remove every session that expired at or before `now`; returns how many
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Count sessions that completed the OAuth flow
    fn count_authenticated(&self) -> Result<usize>;

    /// Count all sessions, pending included
    fn count(&self) -> Result<usize>;
}
