use std::fs;
use std::path::{Path, PathBuf};

use super::TokenStore;
use crate::common::TokenPair;
use crate::error::AuthError;

/// Persists the token pair as JSON in a single owner-only file.
pub struct FileTokenStore {
    token_path: PathBuf,
}

impl FileTokenStore {
    /// Store under the user cache directory, e.g. `~/.cache/folio/tokens.json`.
    pub fn new() -> Result<Self, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find cache directory".to_string()))?
            .join("folio");

        Self::at(cache_dir.join("tokens.json"))
    }

    pub fn at(token_path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let token_path = token_path.into();

        if let Some(dir) = token_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to create token directory: {}", e))
                })?;
            }
        }

        Ok(Self { token_path })
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.token_path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, AuthError> {
        if !self.token_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to read tokens: {}", e)))?;

        let pair: TokenPair = serde_json::from_str(&json)?;
        Ok(Some(pair))
    }

    fn save(&self, pair: &TokenPair) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(pair)?;
        let staging = self.staging_path();

        fs::write(&staging, json)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save tokens: {}", e)))?;

        // Set permissions to 0600 (read/write for owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&staging)
                .map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to get file permissions: {}", e))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&staging, perms).map_err(|e| {
                AuthError::TokenStorage(format!("Failed to set file permissions: {}", e))
            })?;
        }

        // rename is atomic on the same filesystem, so readers see the old or the new pair
        fs::rename(&staging, &self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save tokens: {}", e)))?;

        tracing::debug!(path = %self.token_path.display(), "Persisted token pair");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .map_err(|e| AuthError::TokenStorage(format!("Failed to delete tokens: {}", e)))?;
        }
        Ok(())
    }
}
