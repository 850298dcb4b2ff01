mod events;
mod state;

pub use events::SessionEvent;
pub use state::{SessionState, SessionStatus, StatusWatcher};

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::common::{Grant, TokenPair};
use crate::endpoint::{EndpointError, TokenEndpoint};
use crate::error::AuthError;
use crate::store::TokenStore;
use state::Snapshot;

const EVENT_CAPACITY: usize = 64;

/// A refresh cycle makes at most this many exchange attempts.
const REFRESH_ATTEMPTS: u32 = 2;

/// Timing knobs for a [`TokenSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// An access token closer than this to expiry is no longer handed out.
    pub grace_window: Duration,
    /// How long before expiry the background refresh fires.
    pub refresh_lead_time: Duration,
    /// Delay between a failed refresh attempt's start and the retry.
    pub retry_backoff: Duration,
    /// How long `initialize` waits for an authorization code.
    pub authorization_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::seconds(30),
            refresh_lead_time: Duration::seconds(60),
            retry_backoff: Duration::seconds(5),
            authorization_timeout: Duration::seconds(300),
        }
    }
}

/// Why [`TokenSession::run_refresh_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshLoopExit {
    Cancelled,
    Expired,
    Failed,
}

enum CycleOutcome {
    Refreshed,
    Cancelled,
}

/// Owns one OAuth session: acquires, stores, serves and refreshes its token pair.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct TokenSession {
    shared: Arc<Shared>,
}

struct Shared {
    snapshot: watch::Sender<Snapshot>,
    events: broadcast::Sender<SessionEvent>,
    endpoint: Arc<dyn TokenEndpoint>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    // held across a code exchange so the init timeout cannot interleave with it
    authorization: Mutex<()>,
}

impl TokenSession {
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                snapshot,
                events,
                endpoint,
                store,
                clock,
                config,
                authorization: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.snapshot.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.snapshot.borrow().status()
    }

    pub fn watch(&self) -> StatusWatcher {
        StatusWatcher::new(self.shared.snapshot.subscribe())
    }

    /// Subscribe to session events. Slow receivers lose the oldest events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Restores the stored session, or waits for [`complete_authorization`] if there is none.
    ///
    /// Resolves once the session is `Active`. If no code arrives within the authorization
    /// timeout the session drops back to `Uninitialized` and `NoStoredSession` is returned.
    ///
    /// [`complete_authorization`]: TokenSession::complete_authorization
    pub async fn initialize(&self) -> Result<(), AuthError> {
        let state = self.state();
        if state != SessionState::Uninitialized {
            return Err(AuthError::InvalidState {
                operation: "initialize",
                state,
            });
        }

        let now = self.shared.clock.now();
        match self.shared.store.load()? {
            Some(pair) if !pair.is_expired_at(now) => {
                tracing::info!(expires_at = %pair.expires_at(), "Restored stored session");
                self.transition(&[SessionState::Uninitialized], SessionState::Active, Some(pair))
                    .map_err(invalid_state("initialize"))?;
                return Ok(());
            }
            Some(pair) => {
                tracing::warn!(expired_at = %pair.expires_at(), "Stored session expired, authorization required");
            }
            None => tracing::info!("No stored session, authorization required"),
        }

        let deadline = now + self.shared.config.authorization_timeout;
        let mut rx = self.shared.snapshot.subscribe();
        self.transition(&[SessionState::Uninitialized], SessionState::Authorizing, None)
            .map_err(invalid_state("initialize"))?;

        let settled = async {
            rx.wait_for(|s| s.state != SessionState::Authorizing)
                .await
                .map(|s| s.state)
        };

        tokio::select! {
            settled = settled => match settled {
                Ok(state) => self.authorization_outcome(state),
                Err(_) => Err(AuthError::SessionClosed),
            },
            _ = self.shared.clock.sleep_until(deadline) => {
                let _guard = self.shared.authorization.lock().await;
                match self.transition(&[SessionState::Authorizing], SessionState::Uninitialized, None) {
                    Ok(_) => {
                        tracing::warn!("No authorization code supplied before timeout");
                        Err(AuthError::NoStoredSession)
                    }
                    // a code exchange finished while we waited for the lock
                    Err(state) => self.authorization_outcome(state),
                }
            }
        }
    }

    /// Exchanges an authorization code while the session is `Authorizing`.
    pub async fn complete_authorization(&self, code: &str) -> Result<(), AuthError> {
        let _guard = self.shared.authorization.lock().await;

        let state = self.state();
        if state != SessionState::Authorizing {
            return Err(AuthError::InvalidState {
                operation: "complete_authorization",
                state,
            });
        }

        let grant = Grant::AuthorizationCode {
            code: code.to_string(),
        };

        match self.exchange(&grant, 1).await {
            Ok(pair) => {
                self.persist(&pair);
                self.transition(&[SessionState::Authorizing], SessionState::Active, Some(pair))
                    .map_err(invalid_state("complete_authorization"))?;
                Ok(())
            }
            Err(error) => {
                self.record_error(error.clone());
                let _ = self.transition(&[SessionState::Authorizing], SessionState::Failed, None);
                Err(AuthError::ExchangeRejected(error))
            }
        }
    }

    /// The current access token, if the session is `Active` and it is outside the grace window.
    ///
    /// Never blocks and never triggers a refresh.
    pub fn current_token(&self) -> Result<String, AuthError> {
        let now = self.shared.clock.now();
        let snapshot = self.shared.snapshot.borrow();

        match (snapshot.state, &snapshot.tokens) {
            (SessionState::Active, Some(pair))
                if pair.is_usable_at(now, self.shared.config.grace_window) =>
            {
                Ok(pair.access_token().to_string())
            }
            (state, _) => Err(AuthError::TokenUnavailable(state)),
        }
    }

    /// Runs one refresh cycle now, outside the schedule.
    ///
    /// Fails with `InvalidState` unless the session is `Active`, so it never overlaps the
    /// background loop's own cycle.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_cycle(&CancellationToken::new())
            .await
            .map(|_| ())
    }

    /// Keeps the session refreshed until it is cancelled or reaches a terminal state.
    ///
    /// Waits for the session to become `Active`, sleeps until `expires_at - refresh_lead_time`
    /// and runs a refresh cycle. Cancellation stops the next wait; an exchange already sent
    /// is allowed to finish unless the current pair expires first, in which case the session
    /// moves to `Expired` and the late response is dropped.
    pub async fn run_refresh_loop(&self, cancel: CancellationToken) -> RefreshLoopExit {
        let mut rx = self.shared.snapshot.subscribe();
        tracing::debug!("Refresh loop started");

        loop {
            let ready = async {
                rx.wait_for(|s| {
                    matches!(
                        s.state,
                        SessionState::Active | SessionState::Expired | SessionState::Failed
                    )
                })
                .await
                .map(|s| (s.state, s.tokens.as_ref().map(TokenPair::expires_at)))
            };

            let (state, expires_at) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return RefreshLoopExit::Cancelled,
                ready = ready => match ready {
                    Ok(ready) => ready,
                    Err(_) => return RefreshLoopExit::Cancelled,
                },
            };

            let expires_at = match (state, expires_at) {
                (SessionState::Active, Some(expires_at)) => expires_at,
                (SessionState::Expired, _) => return RefreshLoopExit::Expired,
                _ => return RefreshLoopExit::Failed,
            };

            if self.shared.clock.now() >= expires_at {
                self.transition(&[SessionState::Active], SessionState::Expired, None)
                    .ok();
                continue;
            }

            let refresh_at = expires_at - self.shared.config.refresh_lead_time;
            tracing::debug!(%refresh_at, %expires_at, "Next refresh scheduled");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return RefreshLoopExit::Cancelled,
                // a forced refresh or any other change means a new schedule
                changed = rx.changed() => {
                    if changed.is_err() {
                        return RefreshLoopExit::Cancelled;
                    }
                    continue;
                }
                _ = self.shared.clock.sleep_until(refresh_at) => {}
            }

            if self.shared.clock.now() >= expires_at {
                self.transition(&[SessionState::Active], SessionState::Expired, None)
                    .ok();
                continue;
            }

            match self.refresh_cycle(&cancel).await {
                Ok(CycleOutcome::Refreshed) => {}
                Ok(CycleOutcome::Cancelled) => return RefreshLoopExit::Cancelled,
                Err(e) => tracing::debug!(error = %e, "Refresh cycle ended without new tokens"),
            }
        }
    }

    async fn refresh_cycle(&self, cancel: &CancellationToken) -> Result<CycleOutcome, AuthError> {
        let current = self.begin_refresh()?;
        let deadline = current.expires_at();

        if current.is_expired_at(self.shared.clock.now()) {
            return Err(self.expire_refresh(deadline));
        }

        let grant = Grant::RefreshToken {
            refresh_token: current.refresh_token().to_string(),
        };

        let mut attempt = 1;
        loop {
            // a response that lands after the old pair expired is discarded
            let result = tokio::select! {
                biased;
                _ = self.shared.clock.sleep_until(deadline) => {
                    return Err(self.expire_refresh(deadline));
                }
                result = self.exchange(&grant, attempt) => result,
            };

            match result {
                Ok(pair) => {
                    self.persist(&pair);
                    self.transition(&[SessionState::Refreshing], SessionState::Active, Some(pair))
                        .map_err(invalid_state("refresh"))?;
                    return Ok(CycleOutcome::Refreshed);
                }
                Err(error) if attempt < REFRESH_ATTEMPTS => {
                    let retry_at = self.shared.clock.now() + self.shared.config.retry_backoff;
                    self.record_error(error);
                    tracing::debug!(%retry_at, "Retrying refresh after backoff");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(CycleOutcome::Cancelled),
                        _ = self.shared.clock.sleep_until(retry_at.min(deadline)) => {}
                    }

                    if current.is_expired_at(self.shared.clock.now()) {
                        return Err(self.expire_refresh(deadline));
                    }

                    attempt += 1;
                }
                Err(error) => {
                    self.record_error(error.clone());
                    let _ = self.transition(&[SessionState::Refreshing], SessionState::Failed, None);
                    return Err(AuthError::from(error));
                }
            }
        }
    }

    fn expire_refresh(&self, expired_at: DateTime<Utc>) -> AuthError {
        tracing::warn!(%expired_at, "Token pair expired before a refresh succeeded");
        let _ = self.transition(&[SessionState::Refreshing], SessionState::Expired, None);
        AuthError::TokenUnavailable(SessionState::Expired)
    }

    /// Claims the session for a refresh cycle, returning the pair being replaced.
    fn begin_refresh(&self) -> Result<TokenPair, AuthError> {
        let mut claimed = Err(SessionState::Uninitialized);

        self.shared.snapshot.send_if_modified(|snapshot| {
            match (snapshot.state, &snapshot.tokens) {
                (SessionState::Active, Some(pair)) => {
                    claimed = Ok(pair.clone());
                    snapshot.state = SessionState::Refreshing;
                    true
                }
                (state, _) => {
                    claimed = Err(state);
                    false
                }
            }
        });

        match claimed {
            Ok(pair) => {
                self.announce(SessionState::Active, SessionState::Refreshing);
                Ok(pair)
            }
            Err(state) => Err(AuthError::InvalidState {
                operation: "refresh",
                state,
            }),
        }
    }

    async fn exchange(&self, grant: &Grant, attempt: u32) -> Result<TokenPair, EndpointError> {
        let kind = grant.kind();
        tracing::debug!(grant = %kind, attempt, "Exchanging grant");

        let result = match self.shared.endpoint.exchange(grant.clone()).await {
            Ok(pair) if pair.is_expired_at(self.shared.clock.now()) => Err(EndpointError::Malformed(
                "issued token pair is already expired".to_string(),
            )),
            other => other,
        };

        match &result {
            Ok(pair) => {
                tracing::info!(grant = %kind, expires_at = %pair.expires_at(), "Token pair issued");
                self.publish(SessionEvent::TokensIssued {
                    grant: kind,
                    expires_at: pair.expires_at(),
                });
            }
            Err(error) => {
                tracing::warn!(grant = %kind, attempt, error = %error, "Token exchange failed");
                self.publish(SessionEvent::ExchangeFailed {
                    grant: kind,
                    attempt,
                    error: error.clone(),
                });
            }
        }

        result
    }

    /// Storage failures never take a working session down.
    fn persist(&self, pair: &TokenPair) {
        if let Err(e) = self.shared.store.save(pair) {
            tracing::error!(error = %e, "Failed to persist token pair");
            self.publish(SessionEvent::PersistFailed {
                error: e.to_string(),
            });
        }
    }

    fn record_error(&self, error: EndpointError) {
        self.shared
            .snapshot
            .send_modify(|snapshot| snapshot.last_error = Some(error));
    }

    fn authorization_outcome(&self, state: SessionState) -> Result<(), AuthError> {
        match state {
            SessionState::Active | SessionState::Refreshing => Ok(()),
            SessionState::Failed => {
                let last_error = self.shared.snapshot.borrow().last_error.clone();
                Err(last_error
                    .map(AuthError::ExchangeRejected)
                    .unwrap_or(AuthError::TokenUnavailable(state)))
            }
            state => Err(AuthError::TokenUnavailable(state)),
        }
    }

    /// Moves to `to` only if the current state is one of `from`.
    ///
    /// Returns the state that was replaced, or the state that blocked the move.
    fn transition(
        &self,
        from: &[SessionState],
        to: SessionState,
        tokens: Option<TokenPair>,
    ) -> Result<SessionState, SessionState> {
        let mut outcome = Err(SessionState::Uninitialized);

        self.shared.snapshot.send_if_modified(|snapshot| {
            if !from.contains(&snapshot.state) {
                outcome = Err(snapshot.state);
                return false;
            }
            outcome = Ok(snapshot.state);
            snapshot.state = to;
            if let Some(pair) = tokens {
                snapshot.tokens = Some(pair);
            }
            true
        });

        if let Ok(previous) = outcome {
            self.announce(previous, to);
        }
        outcome
    }

    fn announce(&self, from: SessionState, to: SessionState) {
        if to.is_terminal() {
            tracing::error!(%from, %to, "Session can no longer issue tokens");
        } else {
            tracing::info!(%from, %to, "Session state changed");
        }
        self.publish(SessionEvent::StateChanged { from, to });
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.shared.events.send(event);
    }
}

fn invalid_state(operation: &'static str) -> impl Fn(SessionState) -> AuthError {
    move |state| AuthError::InvalidState { operation, state }
}
