use chrono::Duration;
use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;

use crate::session::SessionConfig;

const DEFAULT_AUTHORIZE_URL: &str = "https://api.schwabapi.com/v1/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://api.schwabapi.com/v1/oauth/token";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub oauth: OAuthSettings,

    #[serde(default)]
    pub session: SessionSettings,

    /// Where the token pair is persisted. Defaults to the user cache directory.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,

    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    #[serde(default = "default_grace_window")]
    pub grace_window_secs: u64,

    #[serde(default = "default_refresh_lead")]
    pub refresh_lead_secs: u64,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    #[serde(default = "default_authorization_timeout")]
    pub authorization_timeout_secs: u64,
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_grace_window() -> u64 {
    30
}

fn default_refresh_lead() -> u64 {
    60
}

fn default_retry_backoff() -> u64 {
    5
}

fn default_authorization_timeout() -> u64 {
    300
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            grace_window_secs: default_grace_window(),
            refresh_lead_secs: default_refresh_lead(),
            retry_backoff_secs: default_retry_backoff(),
            authorization_timeout_secs: default_authorization_timeout(),
        }
    }
}

impl SessionSettings {
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig {
            grace_window: seconds(self.grace_window_secs),
            refresh_lead_time: seconds(self.refresh_lead_secs),
            retry_backoff: seconds(self.retry_backoff_secs),
            authorization_timeout: seconds(self.authorization_timeout_secs),
        }
    }
}

// Keeps deadline arithmetic on DateTime<Utc> far away from overflow.
const MAX_SETTING_SECS: u64 = 10 * 365 * 86_400;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_SETTING_SECS) as i64)
}

impl Settings {
    /// Loads `config.toml` (or the file named by `FOLIO_CONFIG`) overlaid with
    /// `FOLIO_*` environment variables, e.g. `FOLIO_OAUTH__CLIENT_ID`.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("FOLIO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        Self::load(&config_path)
    }

    /// Like [`Settings::new`] with an explicit config file. A missing file is not an error.
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        Self::from_config(settings)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.oauth.client_id.is_empty() {
            return Err("oauth.client_id is required".to_string());
        }
        if self.oauth.client_secret.expose_secret().is_empty() {
            return Err("oauth.client_secret is required".to_string());
        }
        for (name, value) in [
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("oauth.authorize_url", &self.oauth.authorize_url),
            ("oauth.token_url", &self.oauth.token_url),
        ] {
            if !value.starts_with("http") {
                return Err(format!("{} must be a valid HTTP(S) URL", name));
            }
        }
        if self.session.grace_window_secs >= self.session.refresh_lead_secs {
            return Err(
                "session.grace_window_secs must be shorter than session.refresh_lead_secs"
                    .to_string(),
            );
        }
        Ok(())
    }
}
