use thiserror::Error;

use crate::endpoint::EndpointError;
use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No stored session and no authorization code was supplied in time")]
    NoStoredSession,

    #[error("{operation} is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Token endpoint rejected the grant: {0}")]
    ExchangeRejected(EndpointError),

    #[error("No usable access token (session is {0})")]
    TokenUnavailable(SessionState),

    #[error("Token endpoint unreachable: {0}")]
    EndpointUnreachable(EndpointError),

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid authorization redirect: {0}")]
    InvalidRedirect(String),

    #[error("Session has been dropped")]
    SessionClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Whether the caller should back off and ask again later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::TokenUnavailable(state) if !state.is_terminal()
        )
    }
}

impl From<EndpointError> for AuthError {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::Unreachable(_) => AuthError::EndpointUnreachable(err),
            EndpointError::Rejected { .. } | EndpointError::Malformed(_) => {
                AuthError::ExchangeRejected(err)
            }
        }
    }
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
