//! Configuration loading for the analytics server
//!
//! OAuth client credentials come from (in order of priority):
//! 1. Environment variables (`GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`)
//! 2. A Google Cloud Console JSON file (~/.config/mailscope/google-credentials.json)
//!
//! Server settings start from defaults, are overlaid by an optional
//! `settings.json` in the config directory, then by environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";
/// Optional settings filename in the config directory
const SETTINGS_FILE: &str = "settings.json";
/// Default session database filename in the config directory
const SESSION_DB_FILE: &str = "sessions.db";

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/auth/google/callback";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_MESSAGES: usize = 500;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
/// Longest accepted session lifetime
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// OAuth client credentials for Gmail API access
#[derive(Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl GmailCredentials {
    /// Load from the process environment, falling back to the credentials file
    pub fn load() -> Result<Self> {
        let env_lookup = |key: &str| std::env::var(key).ok();
        let has_env = env_lookup("GOOGLE_CLIENT_ID").is_some()
            || env_lookup("GOOGLE_CLIENT_SECRET").is_some();

        if !has_env && config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds, env_lookup("GOOGLE_REDIRECT_URI"));
        }

        Self::from_lookup(env_lookup)
    }

    /// Build credentials from a variable lookup, naming every missing variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let client_id = get("GOOGLE_CLIENT_ID");
        let client_secret = get("GOOGLE_CLIENT_SECRET");

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
                redirect_uri: get("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            }),
            (client_id, client_secret) => {
                let mut missing = Vec::new();
                if client_id.is_none() {
                    missing.push("GOOGLE_CLIENT_ID");
                }
                if client_secret.is_none() {
                    missing.push("GOOGLE_CLIENT_SECRET");
                }
                anyhow::bail!("Missing environment variables: {}", missing.join(", "))
            }
        }
    }

    fn from_credential_file(
        creds: GoogleCredentialFile,
        redirect_override: Option<String>,
    ) -> Result<Self> {
        // Servers are registered as "web" clients, but desktop credentials work too
        let section = creds
            .web
            .or(creds.installed)
            .context("Credentials file missing 'web' or 'installed' section")?;

        let redirect_uri = redirect_override
            .or_else(|| section.redirect_uris.into_iter().next())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uri,
        })
    }

    /// Default credentials file path (~/.config/mailscope/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Where sessions are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Process memory; sessions die with the server
    Memory,
    /// SQLite database file
    Sqlite(PathBuf),
}

impl DatabaseLocation {
    /// Parse a `DATABASE_URL` value: `memory`, `sqlite://<path>`, `sqlite:<path>` or a bare path
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if value.eq_ignore_ascii_case("memory") || value == ":memory:" {
            return Ok(Self::Memory);
        }
        if let Some(path) = value
            .strip_prefix("sqlite://")
            .or_else(|| value.strip_prefix("sqlite:"))
        {
            if path.is_empty() {
                anyhow::bail!("DATABASE_URL has no path: {}", value);
            }
            return Ok(Self::Sqlite(PathBuf::from(path)));
        }
        if value.contains("://") {
            anyhow::bail!("Unsupported DATABASE_URL scheme: {}", value);
        }
        Ok(Self::Sqlite(PathBuf::from(value)))
    }

    fn default_location() -> Self {
        config::config_path(SESSION_DB_FILE)
            .map(Self::Sqlite)
            .unwrap_or(Self::Memory)
    }
}

/// `settings.json` contents; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    bind_addr: Option<String>,
    frontend_url: Option<String>,
    database_url: Option<String>,
    max_messages: Option<usize>,
    session_ttl_hours: Option<i64>,
}

/// Server settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    /// CORS origin and post-login redirect target
    pub frontend_url: String,
    pub database: DatabaseLocation,
    /// Upper bound on messages listed per analytics request
    pub max_messages: usize,
    pub session_ttl_hours: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            database: DatabaseLocation::default_location(),
            max_messages: DEFAULT_MAX_MESSAGES,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl Settings {
    /// Defaults, then `settings.json`, then the process environment
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();
        if config::config_exists(SETTINGS_FILE) {
            let file: SettingsFile = config::load_json(SETTINGS_FILE)?;
            settings.apply_file(file)?;
        }
        settings.apply_lookup(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: SettingsFile) -> Result<()> {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.frontend_url {
            self.frontend_url = v;
        }
        if let Some(v) = file.database_url {
            self.database = DatabaseLocation::parse(&v)?;
        }
        if let Some(v) = file.max_messages {
            self.max_messages = v;
        }
        if let Some(v) = file.session_ttl_hours {
            self.session_ttl_hours = v;
        }
        Ok(())
    }

    /// Overlay values from environment-style variables
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("MAILSCOPE_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = get("FRONTEND_URL") {
            self.frontend_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database = DatabaseLocation::parse(&v)?;
        }
        if let Some(v) = get("MAILSCOPE_MAX_MESSAGES") {
            self.max_messages = v
                .parse()
                .with_context(|| format!("MAILSCOPE_MAX_MESSAGES must be a number, got {v:?}"))?;
        }
        if let Some(v) = get("MAILSCOPE_SESSION_TTL_HOURS") {
            self.session_ttl_hours = v.parse().with_context(|| {
                format!("MAILSCOPE_SESSION_TTL_HOURS must be a number, got {v:?}")
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            anyhow::bail!("max_messages must be at least 1");
        }
        if self.session_ttl_hours <= 0 {
            anyhow::bail!("session_ttl_hours must be positive");
        }
        if self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            anyhow::bail!(
                "session_ttl_hours must be at most {}, got {}",
                MAX_SESSION_TTL_HOURS,
                self.session_ttl_hours
            );
        }
        url::Url::parse(&self.frontend_url)
            .with_context(|| format!("FRONTEND_URL is not a valid URL: {}", self.frontend_url))?;
        Ok(())
    }

    /// Origin part of the frontend URL, as sent in CORS headers
    pub fn frontend_origin(&self) -> Result<String> {
        let url = url::Url::parse(&self.frontend_url)
            .with_context(|| format!("FRONTEND_URL is not a valid URL: {}", self.frontend_url))?;
        Ok(url.origin().ascii_serialization())
    }
}
