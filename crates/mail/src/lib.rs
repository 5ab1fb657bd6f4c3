//! Mail crate - Business logic for Gmail analytics
//!
//! This crate provides the transport-independent core of the server:
//! - Domain models (Session, TokenSet, MessageSummary, EmailAddress)
//! - Gmail API client and OAuth authentication
//! - Session storage trait with in-memory and SQLite backends
//! - Mailbox analytics (senders, hour-of-day and size distributions)
//! - A service facade tying them together for the HTTP layer
//!
//! This crate has no HTTP server dependencies; all I/O is blocking.

pub mod analytics;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod service;
pub mod storage;

pub use analytics::{DateWindow, EmailMetrics, SenderCount, SizeDistribution, TimeDistribution};
pub use config::{DatabaseLocation, GmailCredentials, Settings};
pub use error::{Error, Result};
pub use gmail::{GmailClient, GoogleOAuth, MailboxApi, OAuthProvider, api::ProfileResponse};
pub use models::{EmailAddress, MessageId, MessageSummary, Session, SessionId, SessionState, TokenSet};
pub use service::{
    CallbackParams, LoginRedirect, MailscopeService, ReplyEmailRequest, SendEmailRequest,
    SentMessage, ServiceOptions, TokenStatus,
};
pub use storage::{InMemorySessionStore, SessionStore, SqliteSessionStore};
