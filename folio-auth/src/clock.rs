use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of time for the session.
///
/// Deadlines are absolute instants; a deadline that has already passed resolves immediately.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// Wall-clock time backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        // to_std fails for negative spans, i.e. deadlines already behind us
        if let Ok(remaining) = (deadline - Utc::now()).to_std() {
            tokio::time::sleep(remaining).await;
        }
    }
}
