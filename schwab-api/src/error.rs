use serde::{Deserialize, Serialize};
use tower_api_client::{Error as ApiError, StatusCode};

#[derive(Debug)]
pub enum SchwabApiError {
    Schwab(StatusCode, ErrorResponse),
    Internal(ApiError),
    TokenUnavailable(String),
}

impl From<ApiError> for SchwabApiError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, detail) | ApiError::ServerError(status, detail) => {
                SchwabApiError::Schwab(status, ErrorResponse::parse(&detail))
            }
            e => SchwabApiError::Internal(e),
        }
    }
}

impl std::fmt::Display for SchwabApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchwabApiError::Internal(e) => write!(f, "Internal error: {}", e),
            SchwabApiError::Schwab(status, response) => write!(f, "({}) {}", status, response),
            SchwabApiError::TokenUnavailable(reason) => {
                write!(f, "No access token available: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchwabApiError {}

/// Error body returned by the trader and market data APIs.
///
/// The two APIs disagree on shape, so `errors` is kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl ErrorResponse {
    /// Falls back to the raw body when it is not JSON.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            message: Some(body.to_string()),
            errors: Vec::new(),
        })
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let details: Vec<String> = self
            .errors
            .iter()
            .map(|e| match e {
                serde_json::Value::String(s) => s.clone(),
                other => other
                    .get("detail")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
            .collect();

        match (&self.message, details.is_empty()) {
            (Some(message), true) => f.write_str(message),
            (Some(message), false) => write!(f, "{}: {}", message, details.join("; ")),
            (None, false) => f.write_str(&details.join("; ")),
            (None, true) => f.write_str("unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trader_error_body() {
        let response =
            ErrorResponse::parse(r#"{"message":"Invalid account number","errors":["hash not found"]}"#);

        assert_eq!(response.to_string(), "Invalid account number: hash not found");
    }

    #[test]
    fn market_data_error_body() {
        let response = ErrorResponse::parse(
            r#"{"errors":[{"id":"1","status":"400","title":"Bad Request","detail":"Invalid symbol"}]}"#,
        );

        assert_eq!(response.to_string(), "Invalid symbol");
    }

    #[test]
    fn non_json_body_is_kept() {
        let response = ErrorResponse::parse("Service Unavailable");

        assert_eq!(response.message.as_deref(), Some("Service Unavailable"));
        assert_eq!(response.to_string(), "Service Unavailable");
    }
}
