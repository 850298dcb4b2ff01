// Token types shared by the endpoint, the store and the session
pub mod common;

pub mod authorize;
pub mod clock;
pub mod config;
pub mod endpoint;
pub mod session;
pub mod store;
pub mod testing;

mod client;
mod error;

pub use client::{connect, open_session, token_store};
pub use clock::{Clock, SystemClock};
pub use common::{Grant, GrantKind, TokenPair};
pub use config::{OAuthSettings, SessionSettings, Settings};
pub use endpoint::{EndpointError, OAuthTokenEndpoint, TokenEndpoint};
pub use error::AuthError;
pub use session::{
    RefreshLoopExit, SessionConfig, SessionEvent, SessionState, SessionStatus, StatusWatcher,
    TokenSession,
};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
