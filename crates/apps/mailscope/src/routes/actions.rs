//! Sending mail

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use mail::{Error, ReplyEmailRequest, SendEmailRequest, SentMessage};
use serde::de::DeserializeOwned;

use super::AppState;
use crate::error::ApiError;
use crate::session::request_session;

/// Bodies are decoded after the session check, never before
fn decode<T: DeserializeOwned>(body: &[u8]) -> mail::Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidRequest(format!("Invalid request body: {e}")))
}

/// `POST /api/send-email`
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SentMessage>, ApiError> {
    let session = request_session(&headers);
    let sent = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            let request: SendEmailRequest = decode(&body)?;
            service.send_email(&token, &request)
        })
        .await?;
    Ok(Json(sent))
}

/// `POST /api/reply-email`
pub async fn reply_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SentMessage>, ApiError> {
    let session = request_session(&headers);
    let sent = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            let request: ReplyEmailRequest = decode(&body)?;
            service.reply_to_email(&token, &request)
        })
        .await?;
    Ok(Json(sent))
}
