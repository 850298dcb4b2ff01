use chrono::{Duration, TimeZone, Utc};
use folio_auth::testing::VirtualClock;
use folio_auth::{EndpointError, Grant, OAuthSettings, OAuthTokenEndpoint, TokenEndpoint};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

fn endpoint(server: &MockServer) -> OAuthTokenEndpoint {
    let settings = OAuthSettings {
        client_id: "client-id".to_string(),
        client_secret: SecretString::from("client-secret".to_string()),
        redirect_uri: "https://127.0.0.1:8182".to_string(),
        authorize_url: format!("{}/v1/oauth/authorize", server.uri()),
        token_url: format!("{}/v1/oauth/token", server.uri()),
    };

    let clock = VirtualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    OAuthTokenEndpoint::new(&settings)
        .unwrap()
        .with_clock(Arc::new(clock))
}

fn code() -> Grant {
    Grant::AuthorizationCode {
        code: "C0.abc@".to_string(),
    }
}

fn refresh(token: &str) -> Grant {
    Grant::RefreshToken {
        refresh_token: token.to_string(),
    }
}

#[tokio::test]
async fn code_exchange_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=C0.abc%40"))
        .and(body_string_contains("redirect_uri=https%3A%2F%2F127.0.0.1%3A8182"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 1800,
            "token_type": "Bearer",
            "scope": "api"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pair = endpoint(&server).exchange(code()).await.unwrap();

    assert_eq!(pair.access_token(), "A1");
    assert_eq!(pair.refresh_token(), "R1");
    assert_eq!(
        pair.expires_at(),
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(1800)
    );
}

#[tokio::test]
async fn refresh_without_rotation_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": 1800
        })))
        .mount(&server)
        .await;

    let pair = endpoint(&server).exchange(refresh("R1")).await.unwrap();

    assert_eq!(pair.access_token(), "A2");
    assert_eq!(pair.refresh_token(), "R1");
}

#[tokio::test]
async fn code_exchange_without_refresh_token_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "expires_in": 1800
        })))
        .mount(&server)
        .await;

    let err = endpoint(&server).exchange(code()).await.unwrap_err();
    assert!(matches!(err, EndpointError::Malformed(_)));
}

#[tokio::test]
async fn error_status_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .mount(&server)
        .await;

    let err = endpoint(&server).exchange(refresh("R1")).await.unwrap_err();
    assert_eq!(
        err,
        EndpointError::Rejected {
            http_status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        }
    );
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = endpoint(&server).exchange(refresh("R1")).await.unwrap_err();
    assert!(matches!(err, EndpointError::Malformed(_)));
}

#[tokio::test]
async fn nonpositive_lifetime_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 0
        })))
        .mount(&server)
        .await;

    let err = endpoint(&server).exchange(code()).await.unwrap_err();
    assert!(matches!(err, EndpointError::Malformed(msg) if msg.contains("expires_in")));
}

#[tokio::test]
async fn unreachable_server_is_reported() {
    let server = MockServer::start().await;
    let endpoint = endpoint(&server);
    drop(server);

    let err = endpoint.exchange(refresh("R1")).await.unwrap_err();
    assert!(matches!(err, EndpointError::Unreachable(_)));
}
