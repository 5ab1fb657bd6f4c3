//! MailscopeService facade
//!
//! Everything the HTTP layer does goes through here: the OAuth handshake,
//! session lookup with token refresh, analytics and the mail actions. The
//! service owns no global state; the session store, OAuth provider and
//! Gmail client are injected, which is also how tests substitute them.
//!
//! All methods block (HTTP via ureq, SQLite). Async callers should run them
//! on a blocking thread.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::analytics::{DateWindow, EmailMetrics, SenderCount, SizeDistribution, TimeDistribution};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::gmail::{MailboxApi, OAuthProvider, OutgoingMessage, extract_header, reply_subject, summarize_message};
use crate::models::{MessageId, MessageSummary, Session, SessionId, SessionState};
use crate::storage::SessionStore;

/// How long a login attempt may wait for its callback
pub const PENDING_LOGIN_MINUTES: i64 = 10;

/// Tunables for [`MailscopeService`]
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Upper bound on messages fetched per analytics request
    pub max_messages: usize,
    /// Lifetime of an authenticated session
    pub session_ttl: Duration,
    /// Lifetime of a pending login
    pub pending_ttl: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_messages: crate::config::DEFAULT_MAX_MESSAGES,
            session_ttl: Duration::hours(crate::config::DEFAULT_SESSION_TTL_HOURS),
            pending_ttl: Duration::minutes(PENDING_LOGIN_MINUTES),
        }
    }
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_messages: settings.max_messages,
            session_ttl: Duration::hours(
                settings.session_ttl_hours.clamp(1, crate::config::MAX_SESSION_TTL_HOURS),
            ),
            ..Self::default()
        }
    }
}

/// Where to send the browser to start a login
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub session_id: SessionId,
    pub authorization_url: String,
}

/// Query parameters Google appends to the redirect URI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Result of checking a session's token against Gmail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub valid: bool,
    pub email: String,
    pub messages_total: u64,
    pub threads_total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEmailRequest {
    pub message_id: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    pub status: String,
}

/// Main service object
pub struct MailscopeService {
    store: Arc<dyn SessionStore>,
    oauth: Arc<dyn OAuthProvider>,
    mailbox: Arc<dyn MailboxApi>,
    options: ServiceOptions,
}

impl MailscopeService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        oauth: Arc<dyn OAuthProvider>,
        mailbox: Arc<dyn MailboxApi>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            oauth,
            mailbox,
            options,
        }
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    // ========================================================================
    // OAuth handshake
    // ========================================================================

    /// Record a pending login and return the consent URL for it
    pub fn begin_login(&self) -> Result<LoginRedirect> {
        let now = Utc::now();
        let purged = self.store.purge_expired(now)?;
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }

        let session = Session::pending(now, self.options.pending_ttl);
        let csrf_state = session
            .csrf_state()
            .map(str::to_string)
            .unwrap_or_default();
        self.store.save(&session)?;

        Ok(LoginRedirect {
            session_id: session.id,
            authorization_url: self.oauth.authorization_url(&csrf_state),
        })
    }

    /// Handle the OAuth callback: pending -> authenticated.
    ///
    /// The pending login is found by the echoed `state` and the browser must
    /// present the cookie issued by `begin_login` for that same login. The
    /// authenticated session gets a new id and the pending record is removed.
    /// On any failure the pending login is discarded.
    pub fn complete_login(
        &self,
        cookie: Option<&SessionId>,
        params: &CallbackParams,
    ) -> Result<Session> {
        let result = self.try_complete_login(cookie, params);
        if let Err(err) = &result {
            warn!("OAuth callback rejected: {}", err);
            if let Err(cleanup) = self.discard_pending(cookie, params.state.as_deref()) {
                warn!("Failed to discard pending login: {}", cleanup);
            }
        }
        result
    }

    fn try_complete_login(
        &self,
        cookie: Option<&SessionId>,
        params: &CallbackParams,
    ) -> Result<Session> {
        if let Some(error) = params.error.as_deref() {
            return Err(Error::authentication(format!("Google reported: {}", error)));
        }
        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::authentication("No authorization code received"))?;
        let csrf_state = params
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::authentication("No state parameter received"))?;

        let now = Utc::now();
        let pending = self
            .store
            .find_pending_by_state(csrf_state)?
            .filter(|s| !s.is_expired(now))
            .ok_or_else(|| Error::authentication("Unknown or expired login attempt"))?;

        match cookie {
            Some(cookie) if cookie == &pending.id => {}
            Some(_) => return Err(Error::authentication("Login attempt belongs to another browser")),
            None => return Err(Error::authentication("Missing login session cookie")),
        }

        let tokens = self.oauth.exchange_code(code).map_err(|e| match e {
            Error::Authentication(reason) => Error::Authentication(reason),
            other => Error::authentication(format!("Token exchange failed: {}", other)),
        })?;

        let email = match self.mailbox.get_profile(&tokens.access_token) {
            Ok(profile) => Some(profile.email_address),
            Err(e) => {
                warn!("Could not fetch Gmail profile after login: {}", e);
                None
            }
        };

        let pending_id = pending.id.clone();
        let session = pending.authenticate(tokens, email, now, self.options.session_ttl);
        self.store.remove(&pending_id)?;
        self.store.save(&session)?;

        info!(
            "Login completed for {}",
            match &session.state {
                SessionState::Authenticated { email: Some(email), .. } => email.as_str(),
                _ => "unknown account",
            }
        );
        Ok(session)
    }

    fn discard_pending(&self, cookie: Option<&SessionId>, csrf_state: Option<&str>) -> Result<()> {
        if let Some(csrf_state) = csrf_state
            && let Some(pending) = self.store.find_pending_by_state(csrf_state)?
        {
            self.store.remove(&pending.id)?;
        }
        if let Some(cookie) = cookie
            && let Some(session) = self.store.get(cookie)?
            && !session.is_authenticated()
        {
            self.store.remove(cookie)?;
        }
        Ok(())
    }

    /// Destroy a session; returns whether it existed
    pub fn logout(&self, id: &SessionId) -> Result<bool> {
        let removed = self.store.remove(id)?;
        if removed {
            info!("Session logged out");
        }
        Ok(removed)
    }

    // ========================================================================
    // Session -> access token
    // ========================================================================

    /// A usable Gmail access token for the session, refreshing it when it is
    /// about to expire. Expired sessions and dead refresh tokens end the
    /// session.
    pub fn access_token(&self, id: Option<&SessionId>) -> Result<String> {
        let id = id.ok_or_else(|| Error::authentication("No session"))?;
        let now = Utc::now();

        let session = self
            .store
            .get(id)?
            .ok_or_else(|| Error::authentication("Unknown or expired session"))?;

        if session.is_expired(now) {
            self.store.remove(id)?;
            return Err(Error::authentication("Session expired"));
        }

        let SessionState::Authenticated { tokens, email } = &session.state else {
            return Err(Error::authentication("Login not completed"));
        };

        if !tokens.needs_refresh(now) {
            return Ok(tokens.access_token.clone());
        }

        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            if tokens.is_expired(now) {
                self.store.remove(id)?;
                return Err(Error::authentication("Access token expired and cannot be refreshed"));
            }
            return Ok(tokens.access_token.clone());
        };

        match self.oauth.refresh(refresh_token) {
            Ok(fresh) => {
                let tokens = tokens.refreshed(fresh);
                let access_token = tokens.access_token.clone();
                let session = Session {
                    state: SessionState::Authenticated {
                        tokens,
                        email: email.clone(),
                    },
                    ..session
                };
                self.store.save(&session)?;
                debug!("Refreshed access token");
                Ok(access_token)
            }
            Err(Error::Authentication(reason)) => {
                warn!("Refresh token rejected, ending session: {}", reason);
                self.store.remove(id)?;
                Err(Error::authentication("Session expired; log in again"))
            }
            Err(other) => Err(other),
        }
    }

    // ========================================================================
    // Analytics
    // ========================================================================

    /// Fetch metadata for every message in the window (up to `max_messages`).
    /// Any failed call fails the whole request; there are no partial results.
    pub fn fetch_summaries(&self, access_token: &str, window: DateWindow) -> Result<Vec<MessageSummary>> {
        let query = window.gmail_query(Utc::now().date_naive());
        let refs = self
            .mailbox
            .list_message_refs(access_token, &query, self.options.max_messages)?;
        debug!("Listed {} messages for {:?}", refs.len(), query);

        refs.into_iter()
            .map(|r| {
                self.mailbox
                    .get_message_metadata(access_token, &MessageId::new(r.id))
                    .map(summarize_message)
            })
            .collect()
    }

    pub fn email_metrics(&self, access_token: &str, window: DateWindow) -> Result<EmailMetrics> {
        let summaries = self.fetch_summaries(access_token, window)?;
        Ok(EmailMetrics::from_messages(window.days(), &summaries))
    }

    pub fn top_senders(
        &self,
        access_token: &str,
        window: DateWindow,
        limit: Option<usize>,
    ) -> Result<Vec<SenderCount>> {
        Ok(self.email_metrics(access_token, window)?.top_senders(limit))
    }

    pub fn time_distribution(&self, access_token: &str, window: DateWindow) -> Result<TimeDistribution> {
        Ok(self.email_metrics(access_token, window)?.time_distribution)
    }

    pub fn size_distribution(&self, access_token: &str, window: DateWindow) -> Result<SizeDistribution> {
        Ok(self.email_metrics(access_token, window)?.email_size_distribution)
    }

    pub fn verify_token(&self, access_token: &str) -> Result<TokenStatus> {
        let profile = self.mailbox.get_profile(access_token)?;
        Ok(TokenStatus {
            valid: true,
            email: profile.email_address,
            messages_total: profile.messages_total,
            threads_total: profile.threads_total,
        })
    }

    // ========================================================================
    // Mail actions
    // ========================================================================

    pub fn send_email(&self, access_token: &str, request: &SendEmailRequest) -> Result<SentMessage> {
        let message = OutgoingMessage::new(&request.to, &request.subject, &request.body);
        self.send(access_token, &message)
    }

    /// Reply to the sender of an existing message, threading the reply
    pub fn reply_to_email(&self, access_token: &str, request: &ReplyEmailRequest) -> Result<SentMessage> {
        let original = self
            .mailbox
            .get_message_metadata(access_token, &MessageId::new(&request.message_id))?;

        let payload = original.payload.as_ref();
        let to = payload.and_then(|p| extract_header(p, "From"));
        let subject = payload.and_then(|p| extract_header(p, "Subject"));
        let (Some(to), Some(subject)) = (to, subject) else {
            return Err(Error::upstream(None, "Could not determine recipient or subject"));
        };
        let parent_id = payload.and_then(|p| extract_header(p, "Message-ID"));

        let message = OutgoingMessage::new(to, reply_subject(&subject), &request.body)
            .in_reply_to(parent_id, Some(original.thread_id.clone()));
        self.send(access_token, &message)
    }

    fn send(&self, access_token: &str, message: &OutgoingMessage) -> Result<SentMessage> {
        let request = message.to_send_request()?;
        let sent = self.mailbox.send_raw(access_token, &request)?;
        info!("Sent message {}", sent.id);
        Ok(SentMessage {
            message_id: sent.id,
            status: "sent".to_string(),
        })
    }
}
