//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authorization code flow against Google (behind [`OAuthProvider`])
//! - Gmail API client for listing, reading and sending messages (behind [`MailboxApi`])
//! - Normalization of metadata responses into [`crate::models::MessageSummary`]
//! - RFC 5322 composition for outgoing mail

mod auth;
mod client;
mod compose;
mod normalize;

pub use auth::{GMAIL_SCOPES, GoogleOAuth, OAuthProvider};
pub use client::{GmailClient, MailboxApi};
pub use compose::{OutgoingMessage, reply_subject};
pub use normalize::{extract_header, summarize_message};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: String,
    }

    /// Message fetched with `format=metadata`
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        /// Milliseconds since epoch, as a decimal string
        pub internal_date: Option<String>,
        pub size_estimate: Option<u64>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload; metadata responses only carry headers
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Response from `users/me/profile`
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
        #[serde(default)]
        pub messages_total: u64,
        #[serde(default)]
        pub threads_total: u64,
        pub history_id: Option<String>,
    }

    /// Request body for `users/me/messages/send`
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendMessageRequest {
        /// base64url-encoded RFC 5322 message
        pub raw: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<String>,
    }

    /// Response from `users/me/messages/send`
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendMessageResponse {
        pub id: String,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
    }
}
