//! Tests for the auth module

use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dremio_session(server: &MockServer) -> AuthConfig {
    AuthConfig::Session {
        login_url: format!("{}/apiv2/login", server.uri()),
        login_body: json!({"userName": "admin", "password": "secret"}),
        token_pointer: "/token".to_string(),
        token_header: "Authorization".to_string(),
        token_prefix: Some("_dremio".to_string()),
    }
}

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let client = reqwest::Client::new();
    let req = client.get("https://example.com/api");

    let built = auth.apply(req).await.unwrap().build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "pat-123".to_string(),
    });

    let client = reqwest::Client::new();
    let req = client.get("https://example.com/api");
    let built = auth.apply(req).await.unwrap().build().unwrap();

    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer pat-123"
    );
}

#[tokio::test]
async fn test_session_auth_uses_prefix() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .and(body_partial_json(json!({"userName": "admin"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc123",
            "userName": "admin"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(dremio_session(&mock_server));

    let client = reqwest::Client::new();
    let built = auth
        .apply(client.get("https://example.com/api/v3/source"))
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "_dremioabc123"
    );
}

#[tokio::test]
async fn test_session_login_happens_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(dremio_session(&mock_server));
    auth.login().await.unwrap();
    assert!(auth.has_session().await);

    let client = reqwest::Client::new();
    for _ in 0..3 {
        auth.apply(client.get("https://example.com/")).await.unwrap();
    }
    // MockServer verifies the single login on drop
}

#[tokio::test]
async fn test_session_login_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(dremio_session(&mock_server));
    let err = auth.login().await.unwrap_err();
    assert!(matches!(err, crate::error::Error::Auth { .. }));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_clear_cache_forces_new_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(dremio_session(&mock_server));
    auth.login().await.unwrap();
    auth.clear_cache().await;
    assert!(!auth.has_session().await);
    auth.login().await.unwrap();
}

#[test]
fn test_extract_pointer() {
    let body = json!({"token": "abc", "data": {"expires": 3600, "ok": true}});
    assert_eq!(extract_pointer(&body, "/token"), Some("abc".to_string()));
    assert_eq!(extract_pointer(&body, "token"), Some("abc".to_string()));
    assert_eq!(
        extract_pointer(&body, "/data/expires"),
        Some("3600".to_string())
    );
    assert_eq!(extract_pointer(&body, "/data/ok"), Some("true".to_string()));
    assert_eq!(extract_pointer(&body, "/data"), None);
    assert_eq!(extract_pointer(&body, "/missing"), None);
}
