pub mod endpoints;
mod error;
mod macros;
pub mod repositories;

pub use crate::error::{ErrorResponse, SchwabApiError};
use repositories::*;
use std::sync::Arc;
use tower_api_client::{Client as ApiClient, Request as ApiRequest};

const BASE_URL: &str = "https://api.schwabapi.com";

/// Hands out the bearer token for the next request.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, SchwabApiError>;
}

impl AccessTokenSource for String {
    fn access_token(&self) -> Result<String, SchwabApiError> {
        Ok(self.clone())
    }
}

pub struct Client {
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl Client {
    pub fn new(access_token: &str) -> Self {
        Self::with_token_source(Arc::new(access_token.to_string()))
    }

    /// Asks `tokens` for a fresh token on every request.
    pub fn with_token_source(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            tokens,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, SchwabApiError>
    where
        R: ApiRequest,
    {
        let token = self.tokens.access_token()?;

        // the token may have been rotated since the last request
        ApiClient::new(self.base_url.as_str())
            .bearer_auth(&token)
            .send(request)
            .await
            .map_err(From::from)
    }
}

pub struct Request;

impl Request {
    pub fn new() -> Self {
        Self {}
    }

    pub fn accounts() -> AccountRepository {
        AccountRepository::new()
    }

    pub fn market_data() -> MarketDataRepository {
        MarketDataRepository::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl AccessTokenSource for Unavailable {
        fn access_token(&self) -> Result<String, SchwabApiError> {
            Err(SchwabApiError::TokenUnavailable("session expired".to_string()))
        }
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let client = Client::with_token_source(Arc::new(Unavailable))
            .base_url("http://127.0.0.1:9");

        let err = client
            .send(Request::accounts().numbers())
            .await
            .unwrap_err();

        assert!(matches!(err, SchwabApiError::TokenUnavailable(msg) if msg == "session expired"));
    }

    #[test]
    fn fixed_token_is_returned_as_is() {
        assert_eq!("abc".to_string().access_token().unwrap(), "abc");
    }
}
