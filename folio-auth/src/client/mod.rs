use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinError;

use crate::authorize::{authorization_url, extract_authorization_code};
use crate::clock::SystemClock;
use crate::config::Settings;
use crate::endpoint::OAuthTokenEndpoint;
use crate::error::AuthError;
use crate::session::{SessionState, TokenSession};
use crate::store::FileTokenStore;

/// The file store configured by `settings.token_path`, or the default location.
pub fn token_store(settings: &Settings) -> Result<FileTokenStore, AuthError> {
    match &settings.token_path {
        Some(path) => FileTokenStore::at(path),
        None => FileTokenStore::new(),
    }
}

/// Builds an uninitialized session backed by the real endpoint, file store and clock.
pub fn open_session(settings: &Settings) -> Result<TokenSession, AuthError> {
    settings.validate().map_err(AuthError::Configuration)?;

    let clock = Arc::new(SystemClock);
    let endpoint = OAuthTokenEndpoint::new(&settings.oauth)?.with_clock(clock.clone());
    let store = token_store(settings)?;

    Ok(TokenSession::new(
        Arc::new(endpoint),
        Arc::new(store),
        clock,
        settings.session.to_config(),
    ))
}

/// Returns an `Active` session, walking the user through the browser login if the stored
/// session is missing or expired.
pub async fn connect(settings: &Settings) -> Result<TokenSession, AuthError> {
    let session = open_session(settings)?;
    let mut watcher = session.watch();

    let mut init = tokio::spawn({
        let session = session.clone();
        async move { session.initialize().await }
    });

    tokio::select! {
        joined = &mut init => return flatten(joined).map(|_| session),
        authorizing = watcher.wait_for(|s| s.state == SessionState::Authorizing) => {
            authorizing?;
        }
    }

    let url = authorization_url(&settings.oauth)?;

    println!("\n=== Schwab Authorization Required ===\n");
    if let Err(e) = open::that(url.as_str()) {
        eprintln!("Failed to open browser automatically: {}", e);
        eprintln!("\nPlease open this URL in your browser:");
    } else {
        println!("Browser opened. You can also open this URL directly:");
    }
    println!("{}\n", url);
    println!("After logging in, paste the URL you were redirected to and press Enter:");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            // gave up waiting for a code
            joined = &mut init => return flatten(joined).map(|_| session),
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Err(AuthError::InvalidRedirect(
                        "Input closed before a redirect URL was pasted".to_string(),
                    ));
                };
                match extract_authorization_code(&line) {
                    Ok(code) => {
                        session.complete_authorization(&code).await?;
                        break;
                    }
                    Err(e) => eprintln!("{}\nPaste the full redirect URL:", e),
                }
            }
        }
    }

    flatten(init.await)?;
    println!("✓ Authorization successful!\n");
    Ok(session)
}

fn flatten(joined: Result<Result<(), AuthError>, JoinError>) -> Result<(), AuthError> {
    joined.map_err(|e| AuthError::Io(std::io::Error::other(e)))?
}
