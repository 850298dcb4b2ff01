use folio_auth::{AuthError, TokenSession};
use schwab_api::{AccessTokenSource, SchwabApiError};
use std::time::Duration;

const TOKEN_ATTEMPTS: u32 = 20;
const TOKEN_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Serves API requests from a live session, so a refreshed token is picked up immediately.
pub struct SessionTokenSource {
    session: TokenSession,
}

impl SessionTokenSource {
    pub fn new(session: TokenSession) -> Self {
        Self { session }
    }
}

impl AccessTokenSource for SessionTokenSource {
    fn access_token(&self) -> Result<String, SchwabApiError> {
        self.session
            .current_token()
            .map_err(|e| SchwabApiError::TokenUnavailable(e.to_string()))
    }
}

/// Waits out a refresh in progress before a request goes out.
///
/// Transient unavailability is retried a bounded number of times; an expired or failed
/// session is reported right away.
pub async fn wait_for_token(session: &TokenSession) -> Result<(), AuthError> {
    let mut attempt = 1;
    loop {
        match session.current_token() {
            Ok(_) => return Ok(()),
            Err(e) if e.is_transient() && attempt < TOKEN_ATTEMPTS => {
                tracing::debug!(attempt, error = %e, "Access token not available yet");
                tokio::time::sleep(TOKEN_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use folio_auth::testing::{ScriptedEndpoint, VirtualClock};
    use folio_auth::{Clock, MemoryTokenStore, SessionConfig, SessionState, TokenPair};
    use std::sync::Arc;

    fn session_with(
        endpoint: Arc<ScriptedEndpoint>,
        clock: Arc<VirtualClock>,
        expires_in: Duration,
    ) -> TokenSession {
        let start = clock.now();
        TokenSession::new(
            endpoint,
            Arc::new(MemoryTokenStore::with_pair(TokenPair::new(
                "A0",
                "R0",
                start + expires_in,
            ))),
            clock,
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn follows_the_session() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = Arc::new(VirtualClock::new(start));
        let session = TokenSession::new(
            Arc::new(ScriptedEndpoint::new(clock.clone())),
            Arc::new(MemoryTokenStore::with_pair(TokenPair::new(
                "A0",
                "R0",
                start + Duration::seconds(1800),
            ))),
            clock.clone(),
            SessionConfig::default(),
        );
        let source = SessionTokenSource::new(session.clone());

        assert!(matches!(
            source.access_token(),
            Err(SchwabApiError::TokenUnavailable(_))
        ));

        session.initialize().await.unwrap();
        assert_eq!(source.access_token().unwrap(), "A0");

        // inside the grace window
        clock.advance(Duration::seconds(1790));
        assert!(matches!(
            source.access_token(),
            Err(SchwabApiError::TokenUnavailable(msg)) if msg.contains("active")
        ));
    }

    #[tokio::test]
    async fn waits_out_a_refresh_in_progress() {
        let clock = Arc::new(VirtualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let endpoint = Arc::new(ScriptedEndpoint::new(clock.clone()));
        let session = session_with(endpoint.clone(), clock.clone(), Duration::seconds(1800));
        session.initialize().await.unwrap();

        endpoint.issue("A1", "R1", 1800);
        endpoint.hold();
        let refresh = tokio::spawn({
            let session = session.clone();
            async move { session.refresh().await }
        });
        endpoint.next_call().await.unwrap();
        assert_eq!(session.state(), SessionState::Refreshing);

        let waiting = tokio::spawn({
            let session = session.clone();
            async move { wait_for_token(&session).await }
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        endpoint.release();
        refresh.await.unwrap().unwrap();
        waiting.await.unwrap().unwrap();

        let source = SessionTokenSource::new(session);
        assert_eq!(source.access_token().unwrap(), "A1");
    }

    #[tokio::test]
    async fn expired_session_is_not_retried() {
        let clock = Arc::new(VirtualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let endpoint = Arc::new(ScriptedEndpoint::new(clock.clone()));
        let session = session_with(endpoint, clock.clone(), Duration::seconds(1800));
        session.initialize().await.unwrap();

        let cancel = tokio_util::sync::CancellationToken::new();
        clock.advance(Duration::seconds(3600));
        session.run_refresh_loop(cancel).await;
        assert_eq!(session.state(), SessionState::Expired);

        assert!(matches!(
            wait_for_token(&session).await,
            Err(AuthError::TokenUnavailable(SessionState::Expired))
        ));
    }
}
