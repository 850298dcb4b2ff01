use anyhow::Result;
use folio_auth::{Settings, TokenSession};
use schwab_api::Client;
use std::sync::Arc;

use crate::background::RefreshTask;
use crate::token_source::{wait_for_token, SessionTokenSource};

/// A connected session plus everything that runs on top of it.
pub struct App {
    pub session: TokenSession,
    pub refresh: RefreshTask,
    api: Client,
}

impl App {
    /// Connects (prompting for login if needed) and starts background refresh.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let session = folio_auth::connect(settings).await?;
        tracing::info!(status = ?session.status(), "Session ready");

        let refresh = RefreshTask::spawn(session.clone());
        let api = Client::with_token_source(Arc::new(SessionTokenSource::new(session.clone())));

        Ok(Self {
            session,
            refresh,
            api,
        })
    }

    /// The API client, once the session can hand out a token.
    pub async fn api(&self) -> Result<&Client> {
        wait_for_token(&self.session).await?;
        Ok(&self.api)
    }

    pub async fn shutdown(self) {
        tracing::info!("Cleaning up application");
        self.refresh.shutdown().await;
    }
}
