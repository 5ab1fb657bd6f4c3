//! Gmail API HTTP client
//!
//! Thin wrapper over the REST endpoints the analytics and mail actions need.
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Every call takes the
//! access token explicitly; token lifetime is the service's business.

use std::time::Duration;

use super::api::{
    GmailMessage, ListMessagesResponse, MessageRef, ProfileResponse, SendMessageRequest,
    SendMessageResponse,
};
use crate::error::{Error, Result};
use crate::models::MessageId;

/// Largest page size the Gmail list endpoint accepts
pub const MAX_PAGE_SIZE: usize = 500;

/// Gmail operations used by the service
pub trait MailboxApi: Send + Sync {
    /// One page of message references matching a Gmail search query
    fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse>;

    /// Message headers and size estimate (`format=metadata`)
    fn get_message_metadata(&self, access_token: &str, id: &MessageId) -> Result<GmailMessage>;

    /// Mailbox profile (address and totals)
    fn get_profile(&self, access_token: &str) -> Result<ProfileResponse>;

    /// Send a base64url-encoded RFC 5322 message
    fn send_raw(&self, access_token: &str, request: &SendMessageRequest)
    -> Result<SendMessageResponse>;

    /// Follow `nextPageToken` until `max_messages` references are collected
    /// or the listing is exhausted.
    fn list_message_refs(
        &self,
        access_token: &str,
        query: &str,
        max_messages: usize,
    ) -> Result<Vec<MessageRef>> {
        let mut refs: Vec<MessageRef> = Vec::new();
        let mut page_token: Option<String> = None;

        while refs.len() < max_messages {
            let want = (max_messages - refs.len()).min(MAX_PAGE_SIZE);
            let page = self.list_messages(access_token, query, want, page_token.as_deref())?;

            if let Some(messages) = page.messages {
                refs.extend(messages);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        refs.truncate(max_messages);
        Ok(refs)
    }
}

/// Gmail REST client
pub struct GmailClient {
    agent: ureq::Agent,
    base_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Headers requested with `format=metadata`
    const METADATA_HEADERS: &'static [&'static str] = &["From", "Subject", "Date", "Message-ID"];

    pub fn new() -> Self {
        Self::with_base_url(Self::BASE_URL)
    }

    /// Point the client at another endpoint (e.g. a local stub)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Self::TIMEOUT))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn list_url(&self, query: &str, max_results: usize, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}&q={}",
            self.base_url,
            max_results.clamp(1, MAX_PAGE_SIZE),
            urlencoding::encode(query)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        url
    }

    fn metadata_url(&self, id: &MessageId) -> String {
        let mut url = format!(
            "{}/users/me/messages/{}?format=metadata",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        for header in Self::METADATA_HEADERS {
            url.push_str(&format!("&metadataHeaders={}", header));
        }
        url
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        action: &str,
    ) -> Result<T> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| Error::from_gmail(e, action))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::upstream(None, format!("Failed to parse response to {action}: {e}")))
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MailboxApi for GmailClient {
    fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let url = self.list_url(query, max_results, page_token);
        self.get_json(&url, access_token, "list messages")
    }

    fn get_message_metadata(&self, access_token: &str, id: &MessageId) -> Result<GmailMessage> {
        let url = self.metadata_url(id);
        self.get_json(&url, access_token, "get message")
    }

    fn get_profile(&self, access_token: &str) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", self.base_url);
        self.get_json(&url, access_token, "get profile")
    }

    fn send_raw(
        &self,
        access_token: &str,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse> {
        let url = format!("{}/users/me/messages/send", self.base_url);

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(request)
            .map_err(|e| Error::from_gmail(e, "send message"))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::upstream(None, format!("Failed to parse send response: {e}")))
    }
}
