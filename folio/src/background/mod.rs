use folio_auth::{RefreshLoopExit, TokenSession};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Keeps a session's tokens fresh on a background task.
/// Cancelled on shutdown or when dropped.
pub struct RefreshTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<RefreshLoopExit>>,
}

impl RefreshTask {
    pub fn spawn(session: TokenSession) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let exit = session.run_refresh_loop(cancel).await;
                tracing::info!(?exit, "Refresh loop stopped");
                exit
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Resolves when the loop stops by itself, i.e. the session expired or failed.
    pub async fn finished(&mut self) -> RefreshLoopExit {
        match self.handle.as_mut() {
            Some(handle) => {
                let exit = handle.await.unwrap_or(RefreshLoopExit::Cancelled);
                self.handle = None;
                exit
            }
            None => std::future::pending().await,
        }
    }

    /// Stops the loop and waits for it to wind down.
    pub async fn shutdown(mut self) -> Option<RefreshLoopExit> {
        self.cancel.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.ok(),
            None => None,
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
