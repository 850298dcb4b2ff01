use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionState;
use crate::common::GrantKind;
use crate::endpoint::EndpointError;

/// Published on the session's event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Sent before the session reacts to the failure.
    ExchangeFailed {
        grant: GrantKind,
        attempt: u32,
        error: EndpointError,
    },
    TokensIssued {
        grant: GrantKind,
        expires_at: DateTime<Utc>,
    },
    /// The pair is live in memory but did not reach the store.
    PersistFailed {
        error: String,
    },
}
