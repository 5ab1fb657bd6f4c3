//! SQLite-backed session storage
//!
//! Sessions (and the OAuth tokens they hold) survive restarts. Messages and
//! analytics never touch the database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::SessionStore;
use crate::models::{Session, SessionId, SessionState, TokenSet};

const STATE_PENDING: &str = "pending";
const STATE_AUTHENTICATED: &str = "authenticated";

/// Database migrations
///
/// Applied in order; the user_version pragma tracks which have run.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: sessions table
        M::up(
            r#"
            -- One row per browser session. Timestamps are unix milliseconds.
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL CHECK (state IN ('pending', 'authenticated')),
                csrf_state TEXT,
                access_token TEXT,
                refresh_token TEXT,
                token_expires_at INTEGER,
                scopes TEXT NOT NULL DEFAULT '[]',
                email TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX idx_sessions_csrf_state
                ON sessions(csrf_state) WHERE csrf_state IS NOT NULL;

            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
            "#,
        ),
    ])
}

const SELECT_COLUMNS: &str = "SELECT id, state, csrf_state, access_token, refresh_token, \
     token_expires_at, scopes, email, created_at, expires_at FROM sessions";

/// Raw row, converted to a [`Session`] outside the rusqlite closure so that
/// malformed rows surface as descriptive errors
struct SessionRow {
    id: String,
    state: String,
    csrf_state: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expires_at: Option<i64>,
    scopes: String,
    email: Option<String>,
    created_at: i64,
    expires_at: i64,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            state: row.get(1)?,
            csrf_state: row.get(2)?,
            access_token: row.get(3)?,
            refresh_token: row.get(4)?,
            token_expires_at: row.get(5)?,
            scopes: row.get(6)?,
            email: row.get(7)?,
            created_at: row.get(8)?,
            expires_at: row.get(9)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        let state = match self.state.as_str() {
            STATE_PENDING => SessionState::Pending {
                csrf_state: self
                    .csrf_state
                    .with_context(|| format!("Pending session {} has no csrf_state", self.id))?,
            },
            STATE_AUTHENTICATED => SessionState::Authenticated {
                tokens: TokenSet {
                    access_token: self.access_token.with_context(|| {
                        format!("Authenticated session {} has no access token", self.id)
                    })?,
                    refresh_token: self.refresh_token,
                    expires_at: self.token_expires_at.map(from_millis).transpose()?,
                    scopes: serde_json::from_str(&self.scopes)
                        .with_context(|| format!("Invalid scopes for session {}", self.id))?,
                },
                email: self.email,
            },
            other => return Err(anyhow!("Unknown session state {:?} for {}", other, self.id)),
        };

        Ok(Session {
            id: SessionId::new(self.id),
            state,
            created_at: from_millis(self.created_at)?,
            expires_at: from_millis(self.expires_at)?,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .with_context(|| format!("Timestamp out of range: {}", millis))
}

/// SQLite-based session storage
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        // WAL lets readers proceed while a login writes
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;

        Self::from_connection(conn)
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("session database lock poisoned"))
    }
}

impl SessionStore for SqliteSessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let conn = self.conn()?;

        let (state, csrf_state, tokens, email) = match &session.state {
            SessionState::Pending { csrf_state } => (STATE_PENDING, Some(csrf_state.as_str()), None, None),
            SessionState::Authenticated { tokens, email } => {
                (STATE_AUTHENTICATED, None, Some(tokens), email.as_deref())
            }
        };
        let scopes = serde_json::to_string(&tokens.map(|t| t.scopes.clone()).unwrap_or_default())?;

        conn.execute(
            "INSERT OR REPLACE INTO sessions
                (id, state, csrf_state, access_token, refresh_token, token_expires_at,
                 scopes, email, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id.as_str(),
                state,
                csrf_state,
                tokens.map(|t| t.access_token.as_str()),
                tokens.and_then(|t| t.refresh_token.as_deref()),
                tokens.and_then(|t| t.expires_at).map(|at| at.timestamp_millis()),
                scopes,
                email,
                session.created_at.timestamp_millis(),
                session.expires_at.timestamp_millis(),
            ],
        )
        .with_context(|| format!("Failed to save session {}", session.id))?;

        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.as_str()],
                SessionRow::from_row,
            )
            .optional()?;

        row.map(SessionRow::into_session).transpose()
    }

    fn find_pending_by_state(&self, csrf_state: &str) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE state = ?1 AND csrf_state = ?2"),
                params![STATE_PENDING, csrf_state],
                SessionRow::from_row,
            )
            .optional()?;

        row.map(SessionRow::into_session).transpose()
    }

    fn remove(&self, id: &SessionId) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.as_str()])?;
        Ok(removed > 0)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [now.timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn count_authenticated(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE state = ?1",
            [STATE_AUTHENTICATED],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
