use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

use crate::common::TokenPair;
use crate::endpoint::EndpointError;
use crate::error::AuthError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Authorizing,
    Active,
    Refreshing,
    Expired,
    Failed,
}

impl SessionState {
    /// `Expired` and `Failed` are final: the session never hands out tokens again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Expired | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Authorizing => "authorizing",
            SessionState::Active => "active",
            SessionState::Refreshing => "refreshing",
            SessionState::Expired => "expired",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the host process may know about a session. Never carries token material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// State, current pair and last failure, always replaced together.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub state: SessionState,
    pub tokens: Option<TokenPair>,
    pub last_error: Option<EndpointError>,
}

impl Snapshot {
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            expires_at: self.tokens.as_ref().map(TokenPair::expires_at),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}

/// Follows status changes of a session.
pub struct StatusWatcher {
    rx: watch::Receiver<Snapshot>,
}

impl StatusWatcher {
    pub(crate) fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> SessionStatus {
        self.rx.borrow().status()
    }

    /// Waits for the next change and returns the status after it.
    pub async fn changed(&mut self) -> Result<SessionStatus, AuthError> {
        self.rx
            .changed()
            .await
            .map_err(|_| AuthError::SessionClosed)?;
        Ok(self.rx.borrow_and_update().status())
    }

    /// Resolves immediately if the current status already matches.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<SessionStatus, AuthError>
    where
        F: FnMut(&SessionStatus) -> bool,
    {
        self.rx
            .wait_for(|snapshot| predicate(&snapshot.status()))
            .await
            .map(|snapshot| snapshot.status())
            .map_err(|_| AuthError::SessionClosed)
    }
}
