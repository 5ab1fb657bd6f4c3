//! HTTP routes
//!
//! Handlers are thin: pull the session id and parameters out of the request,
//! run the blocking service call off the async runtime, shape the response.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use mail::{MailscopeService, Settings};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::assets;
use crate::error::ApiError;

pub mod actions;
pub mod analytics;
pub mod auth;

/// Shared state handed to every handler
pub struct AppState {
    pub service: Arc<MailscopeService>,
    /// Post-login redirect target
    pub frontend_url: String,
}

impl AppState {
    pub fn new(service: MailscopeService, settings: &Settings) -> Self {
        Self {
            service: Arc::new(service),
            frontend_url: settings.frontend_url.clone(),
        }
    }

    /// Run a blocking service call on the blocking thread pool
    pub async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: FnOnce(&MailscopeService) -> mail::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        Ok(tokio::task::spawn_blocking(move || call(&service)).await??)
    }
}

pub fn router(state: Arc<AppState>, frontend_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(frontend_origin)
        .with_context(|| format!("Invalid CORS origin: {}", frontend_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/google", get(auth::login))
        .route("/auth/google/callback", get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/api/verify-token", get(auth::verify_token))
        .route("/api/analytics", get(analytics::summary))
        .route("/api/analytics/top-senders", get(analytics::top_senders))
        .route("/api/analytics/time-distribution", get(analytics::time_distribution))
        .route("/api/analytics/size-distribution", get(analytics::size_distribution))
        .route("/api/send-email", post(actions::send_email))
        .route("/api/reply-email", post(actions::reply_email))
        .route("/app", get(assets::index))
        .route("/app/", get(assets::index))
        .route("/app/*path", get(assets::asset))
        .layer(cors)
        .with_state(state))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Gmail Analytics API" }))
}

async fn health() -> &'static str {
    "OK"
}
