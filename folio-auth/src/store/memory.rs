use std::sync::{Mutex, MutexGuard};

use super::TokenStore;
use crate::common::TokenPair;
use crate::error::AuthError;

/// In-process store for ephemeral sessions. Keeps every saved pair in order.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    current: Option<TokenPair>,
    saved: Vec<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `pair`, as if persisted by an earlier run.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: Some(pair),
                saved: Vec::new(),
            }),
        }
    }

    /// Pairs passed to `save`, oldest first.
    pub fn saved(&self) -> Vec<TokenPair> {
        self.lock().map(|inner| inner.saved.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.lock().map(|inner| inner.saved.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AuthError> {
        self.inner
            .lock()
            .map_err(|_| AuthError::TokenStorage("Token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, AuthError> {
        Ok(self.lock()?.current.clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<(), AuthError> {
        let mut inner = self.lock()?;
        inner.current = Some(pair.clone());
        inner.saved.push(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.lock()?.current = None;
        Ok(())
    }
}
