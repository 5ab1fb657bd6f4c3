//! Outgoing message composition
//!
//! Gmail's send endpoint takes a complete RFC 5322 message, base64url-encoded.

use base64::prelude::*;

use super::api::SendMessageRequest;
use crate::error::{Error, Result};

/// A plain-text message to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// `Message-ID` of the message being replied to
    pub in_reply_to: Option<String>,
    /// Gmail thread to file the message under
    pub thread_id: Option<String>,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            in_reply_to: None,
            thread_id: None,
        }
    }

    pub fn in_reply_to(mut self, message_id: Option<String>, thread_id: Option<String>) -> Self {
        self.in_reply_to = message_id;
        self.thread_id = thread_id;
        self
    }

    /// Render the RFC 5322 text. Header values must not smuggle line breaks.
    pub fn render(&self) -> Result<String> {
        let to = self.to.trim();
        if to.is_empty() {
            return Err(Error::InvalidRequest("recipient is required".to_string()));
        }
        for (name, value) in [("To", to), ("Subject", self.subject.as_str())] {
            if value.contains(['\r', '\n']) {
                return Err(Error::InvalidRequest(format!(
                    "{name} must not contain line breaks"
                )));
            }
        }

        let mut message = String::new();
        message.push_str(&format!("To: {}\r\n", to));
        message.push_str(&format!("Subject: {}\r\n", encode_header_value(&self.subject)));
        if let Some(parent) = self.in_reply_to.as_deref().filter(|p| !p.contains(['\r', '\n'])) {
            message.push_str(&format!("In-Reply-To: {}\r\n", parent));
            message.push_str(&format!("References: {}\r\n", parent));
        }
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");
        message.push_str(&normalize_newlines(&self.body));
        Ok(message)
    }

    /// Request body for the send endpoint
    pub fn to_send_request(&self) -> Result<SendMessageRequest> {
        let raw = BASE64_URL_SAFE.encode(self.render()?.as_bytes());
        Ok(SendMessageRequest {
            raw,
            thread_id: self.thread_id.clone(),
        })
    }
}

/// `Re: ` prefixed subject, unless it already is one
pub fn reply_subject(original: &str) -> String {
    let original = original.trim();
    let already_reply = original
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        original.to_string()
    } else {
        format!("Re: {}", original)
    }
}

/// RFC 2047 encoded-word for non-ASCII header values
fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", BASE64_STANDARD.encode(value.as_bytes()))
    }
}

/// Bodies arrive with whatever line endings the client used; mail wants CRLF
fn normalize_newlines(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}
