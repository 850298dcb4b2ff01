mod settings;

pub use settings::{OAuthSettings, SessionSettings, Settings};
