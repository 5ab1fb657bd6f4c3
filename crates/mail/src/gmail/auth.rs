//! Gmail OAuth2 authentication
//!
//! Implements the server side of the authorization code flow: build the
//! consent URL, exchange the callback's code, refresh access tokens.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::config::GmailCredentials;
use crate::error::{Error, Result};
use crate::models::TokenSet;

/// Scopes requested at consent: read mail and send mail
pub const GMAIL_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
];

/// OAuth operations used by the service
pub trait OAuthProvider: Send + Sync {
    /// Consent URL that echoes `state` back on the callback
    fn authorization_url(&self, state: &str) -> String;

    /// Trade an authorization code for tokens
    fn exchange_code(&self, code: &str) -> Result<TokenSet>;

    /// Obtain a fresh access token
    fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            scopes: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Google's OAuth2 endpoints
pub struct GoogleOAuth {
    credentials: GmailCredentials,
    agent: ureq::Agent,
}

impl GoogleOAuth {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(credentials: GmailCredentials) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Self::TIMEOUT))
            .build()
            .into();

        Self {
            credentials,
            agent,
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.credentials.redirect_uri
    }

    fn request_token(&self, form: &[(&str, &str)], action: &str) -> Result<TokenSet> {
        let mut response = self
            .agent
            .post(Self::TOKEN_URL)
            .send_form(form.iter().copied())
            .map_err(|e| Error::from_token_endpoint(e, action))?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::upstream(None, format!("Failed to parse token response: {e}")))?;

        Ok(token.into_token_set())
    }
}

impl OAuthProvider for GoogleOAuth {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&include_granted_scopes=true&prompt=consent&state={}",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode(&GMAIL_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        self.request_token(
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ],
            "exchange authorization code",
        )
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        self.request_token(
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
            "refresh access token",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth() -> GoogleOAuth {
        GoogleOAuth::new(GmailCredentials {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
        })
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = url::Url::parse(&oauth().authorization_url("abc123")).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client id");
        assert_eq!(params["redirect_uri"], "http://localhost:8000/auth/google/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["state"], "abc123");
        assert_eq!(params["scope"], GMAIL_SCOPES.join(" "));
    }

    #[test]
    fn test_redirect_uri_comes_from_credentials() {
        assert_eq!(oauth().redirect_uri(), "http://localhost:8000/auth/google/callback");
    }

    #[test]
    fn test_token_response_conversion() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"scope":"x y","token_type":"Bearer"}"#,
        )
        .unwrap();
        let tokens = response.into_token_set();

        assert_eq!(tokens.access_token, "a");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert_eq!(tokens.scopes, vec!["x".to_string(), "y".to_string()]);
        assert!(!tokens.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a2","expires_in":60}"#).unwrap();
        let tokens = response.into_token_set();

        assert!(tokens.refresh_token.is_none());
        assert!(tokens.scopes.is_empty());
        assert!(tokens.needs_refresh(Utc::now()));
    }
}
