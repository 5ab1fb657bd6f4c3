//! OAuth login, logout and token check

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::info;
use mail::{CallbackParams, TokenStatus};
use serde_json::json;

use super::AppState;
use crate::error::ApiError;
use crate::session::{clear_cookie, cookie_session, request_session, set_cookie};

/// `GET /auth/google`: start a login and send the browser to Google
pub async fn login(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let redirect = state.run(|service| service.begin_login()).await?;
    let max_age = state.service.options().pending_ttl.num_seconds();

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, redirect.authorization_url),
            (header::SET_COOKIE, set_cookie(&redirect.session_id, max_age)),
        ],
    )
        .into_response())
}

/// `GET /auth/google/callback`: finish the login Google redirected back
pub async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let cookie = cookie_session(&headers);
    let session = state
        .run(move |service| service.complete_login(cookie.as_ref(), &params))
        .await?;
    let max_age = state.service.options().session_ttl.num_seconds();

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, state.frontend_url.clone()),
            (header::SET_COOKIE, set_cookie(&session.id, max_age)),
        ],
    )
        .into_response())
}

/// `POST /auth/logout`: forget the session, whether or not it exists
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(id) = request_session(&headers) {
        let removed = state.run(move |service| service.logout(&id)).await?;
        if !removed {
            info!("Logout for unknown session");
        }
    }

    Ok((
        [(header::SET_COOKIE, clear_cookie())],
        Json(json!({ "status": "logged_out" })),
    )
        .into_response())
}

/// `GET /api/verify-token`
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenStatus>, ApiError> {
    let session = request_session(&headers);
    let status = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            service.verify_token(&token)
        })
        .await?;
    Ok(Json(status))
}
