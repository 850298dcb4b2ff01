use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use folio_auth::{SessionEvent, SessionStatus, Settings, TokenPair, TokenStore};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// What is on disk, as opposed to what a live session knows.
#[derive(Debug, Serialize)]
pub struct StoredSession {
    pub token_path: PathBuf,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: Option<bool>,
    pub remaining_secs: Option<i64>,
}

impl StoredSession {
    pub fn new(token_path: PathBuf, pair: Option<&TokenPair>, now: DateTime<Utc>) -> Self {
        Self {
            token_path,
            expires_at: pair.map(TokenPair::expires_at),
            expired: pair.map(|p| p.is_expired_at(now)),
            remaining_secs: pair.map(|p| p.remaining(now).num_seconds()),
        }
    }
}

pub async fn login(settings: &Settings, format: OutputFormat) -> Result<()> {
    let session = folio_auth::connect(settings).await?;

    output::print(&session.status(), format, print_status)
}

pub fn logout(settings: &Settings) -> Result<()> {
    let store = folio_auth::token_store(settings)?;
    store.clear()?;

    tracing::info!(path = %store.path().display(), "Stored session removed");
    output::print_success("Logged out");
    Ok(())
}

pub fn status(settings: &Settings, format: OutputFormat) -> Result<()> {
    let store = folio_auth::token_store(settings)?;
    let now = Utc::now();
    let pair = store.load()?;

    let stored = StoredSession::new(store.path().to_path_buf(), pair.as_ref(), now);

    output::print(&stored, format, |stored| match (stored.expires_at, stored.expired) {
        (Some(expires_at), Some(false)) => {
            let remaining = stored.remaining_secs.unwrap_or_default();
            output::print_success(&format!(
                "Stored session valid until {} ({}m {}s left)",
                expires_at,
                remaining / 60,
                remaining % 60
            ));
        }
        (Some(expires_at), _) => {
            output::print_warning(&format!("Stored session expired at {}", expires_at))
        }
        _ => output::print_warning("No stored session. Run `folio login`."),
    })
}

pub async fn keepalive(settings: &Settings, format: OutputFormat) -> Result<()> {
    let mut app = App::connect(settings).await?;
    let mut events = app.session.events();

    output::print(&app.session.status(), format, print_status)?;
    if format == OutputFormat::Text {
        println!(
            "Keeping the session alive, refreshing {}s before expiry. Press Ctrl-C to stop.",
            app.session.config().refresh_lead_time.num_seconds()
        );
    }

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            exit = app.refresh.finished() => {
                break Err(anyhow!("Session ended ({:?}): {}", exit, describe(&app.session.status())));
            }
            event = events.recv() => match event {
                Ok(event) => output::print(&event, format, print_event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed session events");
                }
                Err(RecvError::Closed) => break Ok(()),
            }
        }
    };

    app.shutdown().await;
    outcome
}

fn print_status(status: &SessionStatus) {
    output::print_success(&describe(status));
}

fn describe(status: &SessionStatus) -> String {
    let mut line = format!("Session {}", status.state);
    if let Some(expires_at) = status.expires_at {
        line.push_str(&format!(", token valid until {}", expires_at));
    }
    if let Some(error) = &status.last_error {
        line.push_str(&format!(", last error: {}", error));
    }
    line
}

fn print_event(event: &SessionEvent) {
    let now = Utc::now().format("%H:%M:%S");
    match event {
        SessionEvent::StateChanged { from, to } => println!("[{}] {} -> {}", now, from, to),
        SessionEvent::TokensIssued { grant, expires_at } => {
            println!("[{}] new tokens via {}, valid until {}", now, grant, expires_at)
        }
        SessionEvent::ExchangeFailed {
            grant,
            attempt,
            error,
        } => println!("[{}] {} attempt {} failed: {}", now, grant, attempt, error),
        SessionEvent::PersistFailed { error } => {
            println!("[{}] could not save tokens: {}", now, error)
        }
    }
}
