//! Mailscope - Gmail analytics over HTTP
//!
//! This is the main entry point for the Mailscope server.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use mail::{
    DatabaseLocation, GmailClient, GmailCredentials, GoogleOAuth, InMemorySessionStore,
    MailscopeService, ServiceOptions, SessionStore, Settings, SqliteSessionStore,
};

mod assets;
mod error;
mod routes;
mod session;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // A missing .env is normal outside development
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        warn!("Failed to read .env file: {}", e);
    }

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = Settings::load().context("Invalid server settings")?;

    let credentials = match GmailCredentials::load() {
        Ok(creds) => creds,
        Err(e) => {
            if let Some(path) = GmailCredentials::default_credentials_path() {
                warn!(
                    "To configure Gmail access, either:\n\
                     1. Set environment variables: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET\n\
                     2. Or place your Google OAuth credentials at: {}",
                    path.display()
                );
            }
            return Err(e.context("Gmail credentials not found"));
        }
    };
    let oauth = GoogleOAuth::new(credentials);
    info!("OAuth redirect URI: {}", oauth.redirect_uri());

    let store = open_store(&settings.database)?;
    let service = MailscopeService::new(
        store,
        Arc::new(oauth),
        Arc::new(GmailClient::new()),
        ServiceOptions::from_settings(&settings),
    );

    let state = Arc::new(AppState::new(service, &settings));
    let app = routes::router(state, &settings.frontend_origin()?)?;

    info!(
        "Starting Mailscope on {} (frontend {})",
        settings.bind_addr, settings.frontend_url
    );

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn open_store(location: &DatabaseLocation) -> Result<Arc<dyn SessionStore>> {
    match location {
        DatabaseLocation::Memory => {
            warn!("Sessions are kept in memory and will not survive a restart");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        DatabaseLocation::Sqlite(path) => {
            info!("Session database: {}", path.display());
            Ok(Arc::new(SqliteSessionStore::new(path)?))
        }
    }
}
