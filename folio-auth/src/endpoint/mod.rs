mod models;
mod oauth;

pub use oauth::OAuthTokenEndpoint;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::common::{Grant, TokenPair};

/// The authorization server's token endpoint.
///
/// Used both for the initial authorization-code exchange and for every refresh.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange(&self, grant: Grant) -> Result<TokenPair, EndpointError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EndpointError {
    #[error("HTTP {http_status}: {body}")]
    Rejected { http_status: u16, body: String },

    #[error("{0}")]
    Unreachable(String),

    #[error("Malformed token response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for EndpointError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.to_string())
    }
}
