//! Session model: a browser's link to an OAuth token pair
//!
//! A session starts `Pending` when the login redirect is issued and becomes
//! `Authenticated` when the OAuth callback exchanges its code. Only
//! authenticated sessions can reach Gmail.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are refreshed this long before Google says they expire
pub const REFRESH_BUFFER_SECS: i64 = 300;

/// Opaque random session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh unguessable identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// OAuth token pair obtained from Google
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Whether the access token expires within the refresh buffer
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(REFRESH_BUFFER_SECS),
            None => false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Apply a refresh response. Google omits the refresh token on refresh,
    /// in which case the one we already hold stays valid.
    pub fn refreshed(&self, mut fresh: TokenSet) -> TokenSet {
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = self.refresh_token.clone();
        }
        if fresh.scopes.is_empty() {
            fresh.scopes = self.scopes.clone();
        }
        fresh
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Where a session is in the OAuth flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// Redirected to Google, waiting for the callback carrying `csrf_state`
    Pending { csrf_state: String },
    /// Callback succeeded
    Authenticated {
        tokens: TokenSet,
        email: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New login attempt expiring after `ttl`
    pub fn pending(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: SessionId::generate(),
            state: SessionState::Pending {
                csrf_state: uuid::Uuid::new_v4().simple().to_string(),
            },
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Transition pending -> authenticated under a fresh id; the pre-consent
    /// id is never authenticated
    pub fn authenticate(
        self,
        tokens: TokenSet,
        email: Option<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            state: SessionState::Authenticated { tokens, email },
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn csrf_state(&self) -> Option<&str> {
        match &self.state {
            SessionState::Pending { csrf_state } => Some(csrf_state),
            SessionState::Authenticated { .. } => None,
        }
    }

    pub fn tokens(&self) -> Option<&TokenSet> {
        match &self.state {
            SessionState::Authenticated { tokens, .. } => Some(tokens),
            SessionState::Pending { .. } => None,
        }
    }
}
