use url::{form_urlencoded, Url};

use crate::config::OAuthSettings;
use crate::error::AuthError;

/// The page the user opens to grant access.
pub fn authorization_url(settings: &OAuthSettings) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &settings.authorize_url,
        &[
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ],
    )
    .map_err(|e| AuthError::Configuration(format!("Invalid authorize URL: {}", e)))
}

/// Pulls the authorization code out of what the user pasted.
///
/// Accepts the full redirect URL (the code is percent-decoded, so `%40` becomes `@`) or
/// the bare code.
pub fn extract_authorization_code(input: &str) -> Result<String, AuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::InvalidRedirect("Nothing was pasted".to_string()));
    }

    let Ok(redirect) = Url::parse(input) else {
        return Ok(decode(input));
    };

    let mut code = None;
    for (key, value) in redirect.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(AuthError::InvalidRedirect(format!(
                    "Authorization was denied: {}",
                    value
                )))
            }
            _ => {}
        }
    }

    code.filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::InvalidRedirect("Redirect URL has no code parameter".to_string()))
}

fn decode(raw: &str) -> String {
    form_urlencoded::parse(format!("code={}", raw).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| raw.to_string())
}
