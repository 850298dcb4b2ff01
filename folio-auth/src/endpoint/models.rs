use serde::{Deserialize, Serialize};

use crate::common::{Grant, GrantKind};

/// Form body posted to the token endpoint.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: GrantKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    pub redirect_uri: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn new(grant: &'a Grant, redirect_uri: &'a str) -> Self {
        let (code, refresh_token) = match grant {
            Grant::AuthorizationCode { code } => (Some(code.as_str()), None),
            Grant::RefreshToken { refresh_token } => (None, Some(refresh_token.as_str())),
        };

        Self {
            grant_type: grant.kind(),
            code,
            refresh_token,
            redirect_uri,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}
