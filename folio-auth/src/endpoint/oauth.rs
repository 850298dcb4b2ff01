use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::models::{TokenRequest, TokenResponse};
use super::{EndpointError, TokenEndpoint};
use crate::clock::{Clock, SystemClock};
use crate::common::{Grant, TokenPair};
use crate::config::OAuthSettings;
use crate::error::AuthError;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_EXPIRES_IN_SECS: i64 = 10 * 365 * 86_400;

/// Token endpoint speaking the OAuth 2.0 form-encoded protocol with HTTP Basic client
/// authentication.
pub struct OAuthTokenEndpoint {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    clock: Arc<dyn Clock>,
}

impl OAuthTokenEndpoint {
    pub fn new(settings: &OAuthSettings) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used to turn `expires_in` into an absolute deadline.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl TokenEndpoint for OAuthTokenEndpoint {
    async fn exchange(&self, grant: Grant) -> Result<TokenPair, EndpointError> {
        let issued_at = self.clock.now();
        let form = TokenRequest::new(&grant, &self.redirect_uri);

        let resp = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(
                grant = %grant.kind(),
                status = status.as_u16(),
                "Token endpoint rejected grant"
            );
            return Err(EndpointError::Rejected {
                http_status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| EndpointError::Malformed(e.to_string()))?;

        if token.expires_in <= 0 || token.expires_in > MAX_EXPIRES_IN_SECS {
            return Err(EndpointError::Malformed(format!(
                "expires_in out of range: {}",
                token.expires_in
            )));
        }

        let refresh_token = match (token.refresh_token, &grant) {
            (Some(refresh_token), _) => refresh_token,
            // Servers that do not rotate refresh tokens omit the field.
            (None, Grant::RefreshToken { refresh_token }) => refresh_token.clone(),
            (None, Grant::AuthorizationCode { .. }) => {
                return Err(EndpointError::Malformed(
                    "No refresh token in response".to_string(),
                ))
            }
        };

        let pair = TokenPair::issued(
            token.access_token,
            refresh_token,
            issued_at,
            Duration::seconds(token.expires_in),
        );

        tracing::debug!(
            grant = %grant.kind(),
            scope = token.scope.as_deref().unwrap_or(""),
            expires_at = %pair.expires_at(),
            "Token endpoint issued tokens"
        );

        Ok(pair)
    }
}
