//! Deterministic stand-ins for the clock and the token endpoint.
//!
//! Used by this crate's tests and by hosts that want to exercise a `TokenSession` without
//! wall-clock waits or a network.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};

use crate::clock::Clock;
use crate::common::{Grant, GrantKind, TokenPair};
use crate::endpoint::{EndpointError, TokenEndpoint};

/// A clock that only moves when told to.
///
/// Sleepers wake as soon as the clock is set at or past their deadline.
pub struct VirtualClock {
    now: watch::Sender<DateTime<Utc>>,
}

impl VirtualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        let (now, _) = watch::channel(start);
        Self { now }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.send_replace(instant);
    }

    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let mut rx = self.now.subscribe();
        let _ = rx.wait_for(|now| *now >= deadline).await;
    }
}

/// One exchange seen by a [`ScriptedEndpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: GrantKind,
    /// The code or refresh token that was presented.
    pub credential: String,
    pub at: DateTime<Utc>,
}

enum Scripted {
    Issue {
        access_token: String,
        refresh_token: String,
        expires_in: Duration,
    },
    Fail(EndpointError),
}

/// Token endpoint that answers from a queue of scripted responses.
///
/// Calls are recorded before the response is chosen. While the endpoint is held, calls
/// wait after being recorded until [`release`](ScriptedEndpoint::release).
pub struct ScriptedEndpoint {
    clock: Arc<dyn Clock>,
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_tx: mpsc::UnboundedSender<RecordedCall>,
    call_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RecordedCall>>,
    open: watch::Sender<bool>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEndpoint {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (call_tx, call_rx) = mpsc::unbounded_channel();
        let (open, _) = watch::channel(true);

        Self {
            clock,
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_tx,
            call_rx: tokio::sync::Mutex::new(call_rx),
            open,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queues a successful response; the pair expires `expires_in_secs` after the call.
    pub fn issue(&self, access_token: &str, refresh_token: &str, expires_in_secs: i64) -> &Self {
        lock(&self.responses).push_back(Scripted::Issue {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in: Duration::seconds(expires_in_secs),
        });
        self
    }

    pub fn fail(&self, error: EndpointError) -> &Self {
        lock(&self.responses).push_back(Scripted::Fail(error));
        self
    }

    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Waits for the next exchange to reach the endpoint.
    pub async fn next_call(&self) -> Option<RecordedCall> {
        self.call_rx.lock().await.recv().await
    }

    /// Highest number of exchanges that were ever in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenEndpoint for ScriptedEndpoint {
    async fn exchange(&self, grant: Grant) -> Result<TokenPair, EndpointError> {
        let call = RecordedCall {
            kind: grant.kind(),
            credential: match grant {
                Grant::AuthorizationCode { code } => code,
                Grant::RefreshToken { refresh_token } => refresh_token,
            },
            at: self.clock.now(),
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        lock(&self.calls).push(call.clone());
        let _ = self.call_tx.send(call.clone());

        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;

        let response = lock(&self.responses).pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Some(Scripted::Issue {
                access_token,
                refresh_token,
                expires_in,
            }) => Ok(TokenPair::issued(
                access_token,
                refresh_token,
                call.at,
                expires_in,
            )),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(EndpointError::Unreachable(
                "no scripted response".to_string(),
            )),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
