//! Per-request message view used by the analytics

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Parse a `From`-style value like `"John Doe" <john@example.com>`
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: email.to_string(),
            };
        }

        Self::new(s)
    }

    /// Grouping key: the address, case-folded
    pub fn key(&self) -> String {
        self.email.to_lowercase()
    }
}

/// Sender key used for messages that carry no `From` header
pub const UNKNOWN_SENDER: &str = "(unknown)";

/// The three facts analytics needs about a message, fetched transiently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub sender: Option<EmailAddress>,
    pub subject: Option<String>,
    /// Arrival time in the offset the sender stamped on the `Date` header,
    /// or UTC when it had to come from Gmail's internal date
    pub received_at: DateTime<FixedOffset>,
    /// Gmail's size estimate in bytes
    pub size_bytes: u64,
}

impl MessageSummary {
    pub fn sender_key(&self) -> String {
        self.sender
            .as_ref()
            .map(EmailAddress::key)
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
    }

    /// Hour of day (0-23) the message arrived
    pub fn hour(&self) -> u8 {
        // hour() is always < 24
        self.received_at.hour() as u8
    }
}
