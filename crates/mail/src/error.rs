//! Error type surfaced to callers of the service layer
//!
//! Plumbing code (stores, config, HTTP parsing) works in `anyhow::Result` and
//! is classified here at the service boundary. Callers only need to tell
//! apart "the user must log in again" from "Gmail failed us".

/// Errors returned by [`crate::MailscopeService`] and the Gmail seams
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing, unknown or expired session, or a failed OAuth exchange
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Gmail (or Google's token endpoint) failed or rate-limited the call
    #[error("Gmail API error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Request parameters the service refuses to act on
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage and other local failures
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication(reason.into())
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Classify a failed Gmail API call.
    ///
    /// 401 and 403 mean Google no longer accepts the access token (or its
    /// scopes), which the caller can only fix by logging in again.
    pub fn from_gmail(err: ureq::Error, action: &str) -> Self {
        match err {
            ureq::Error::StatusCode(status @ (401 | 403)) => Self::authentication(format!(
                "Gmail rejected the access token (HTTP {status}) while trying to {action}"
            )),
            ureq::Error::StatusCode(429) => {
                Self::upstream(Some(429), format!("Rate limited by Gmail while trying to {action}"))
            }
            ureq::Error::StatusCode(status) => {
                Self::upstream(Some(status), format!("Failed to {action}: HTTP {status}"))
            }
            other => Self::upstream(None, format!("Failed to {action}: {other}")),
        }
    }

    /// Classify a failed call to Google's OAuth token endpoint.
    ///
    /// 400 and 401 are how Google reports invalid, expired or already used
    /// codes and revoked refresh tokens.
    pub fn from_token_endpoint(err: ureq::Error, action: &str) -> Self {
        match err {
            ureq::Error::StatusCode(status @ (400 | 401)) => Self::authentication(format!(
                "Google refused to {action} (HTTP {status}); the grant is invalid or expired"
            )),
            ureq::Error::StatusCode(status) => {
                Self::upstream(Some(status), format!("Failed to {action}: HTTP {status}"))
            }
            other => Self::upstream(None, format!("Failed to {action}: {other}")),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Upstream { status: Some(429), .. })
    }
}
