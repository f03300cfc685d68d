use std::time::Duration;

use identity_service::identity::errors::RemoteIdentityError;
use identity_service::identity::ports::IdentityServiceClient;
use identity_service::outbound::remote::GoTrueClient;
use mockito::Matcher;
use mockito::Server;
use serde_json::json;

const ANON_KEY: &str = "test-anon-key";

fn client(base_url: &str) -> GoTrueClient {
    GoTrueClient::new(base_url, ANON_KEY, Duration::from_secs(5)).expect("Failed to build client")
}

fn user_json(id: &str, email: &str) -> serde_json::Value {
    json!({
        "id": id,
        "aud": "authenticated",
        "email": email,
        "email_confirmed_at": "2024-05-01T10:00:00Z"
    })
}

fn session_json(id: &str, email: &str) -> serde_json::Value {
    json!({
        "access_token": "remote-access",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "remote-refresh",
        "user": user_json(id, email)
    })
}

#[tokio::test]
async fn test_password_grant_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .match_header("apikey", ANON_KEY)
        .match_body(Matcher::Json(json!({
            "email": "dave@example.com",
            "password": "hunter22"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(session_json("sub-1", "dave@example.com").to_string())
        .create_async()
        .await;

    let session = client(&server.url())
        .sign_in_with_password("dave@example.com", "hunter22")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(session.access_token, "remote-access");
    assert_eq!(session.refresh_token.as_deref(), Some("remote-refresh"));
    assert_eq!(session.expires_in, Some(3600));
    assert_eq!(session.user.subject_id, "sub-1");
    assert!(session.user.email_verified);
}

#[tokio::test]
async fn test_password_grant_invalid_credentials() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(
            json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })
                .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server.url())
        .sign_in_with_password("dave@example.com", "wrong")
        .await;

    assert_eq!(result.unwrap_err(), RemoteIdentityError::InvalidCredentials);
}

#[tokio::test]
async fn test_sign_up_with_and_without_session() {
    let mut server = Server::new_async().await;
    let _with_session = server
        .mock("POST", "/auth/v1/signup")
        .match_body(Matcher::PartialJson(json!({ "email": "dave@example.com" })))
        .with_status(200)
        .with_body(session_json("sub-1", "dave@example.com").to_string())
        .create_async()
        .await;
    let _confirmation_required = server
        .mock("POST", "/auth/v1/signup")
        .match_body(Matcher::PartialJson(json!({ "email": "erin@example.com" })))
        .with_status(200)
        .with_body(
            json!({ "id": "sub-2", "email": "erin@example.com", "confirmation_sent_at": "2024-05-01T10:00:00Z" })
                .to_string(),
        )
        .create_async()
        .await;
    let client = client(&server.url());

    let with_session = client.sign_up("dave@example.com", "hunter22").await.unwrap();
    let without_session = client.sign_up("erin@example.com", "hunter22").await.unwrap();

    assert_eq!(with_session.user.subject_id, "sub-1");
    assert!(with_session.session.is_some());
    assert_eq!(without_session.user.subject_id, "sub-2");
    assert!(!without_session.user.email_verified);
    assert!(without_session.session.is_none());
}

#[tokio::test]
async fn test_sign_up_conflict() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/auth/v1/signup")
        .with_status(422)
        .with_body(
            json!({ "code": 422, "error_code": "user_already_exists", "msg": "User already registered" })
                .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server.url()).sign_up("dave@example.com", "hunter22").await;

    assert_eq!(result.unwrap_err(), RemoteIdentityError::AlreadyRegistered);
}

#[tokio::test]
async fn test_get_user_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer remote-access")
        .match_header("apikey", ANON_KEY)
        .with_status(200)
        .with_body(user_json("sub-1", "dave@example.com").to_string())
        .create_async()
        .await;

    let user = client(&server.url()).get_user("remote-access").await.unwrap();

    mock.assert_async().await;
    assert_eq!(user.subject_id, "sub-1");
    assert_eq!(user.email.as_deref(), Some("dave@example.com"));
}

#[tokio::test]
async fn test_get_user_rejected_token() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/auth/v1/user")
        .with_status(401)
        .with_body(json!({ "code": 401, "msg": "invalid JWT" }).to_string())
        .create_async()
        .await;

    let result = client(&server.url()).get_user("expired").await;

    assert_eq!(result.unwrap_err(), RemoteIdentityError::InvalidToken);
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/auth/v1/user")
        .with_status(503)
        .with_body("upstream connect error")
        .create_async()
        .await;

    let result = client(&server.url()).get_user("token").await;

    assert!(matches!(result, Err(RemoteIdentityError::Unavailable(_))));
}

#[tokio::test]
async fn test_undecodable_body_is_protocol_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/auth/v1/user")
        .with_status(200)
        .with_body("<html>captive portal</html>")
        .create_async()
        .await;

    let result = client(&server.url()).get_user("token").await;

    assert!(matches!(result, Err(RemoteIdentityError::Protocol(_))));
}

#[tokio::test]
async fn test_refresh_and_logout_and_recover() {
    let mut server = Server::new_async().await;
    let _refresh = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .match_body(Matcher::Json(json!({ "refresh_token": "stale" })))
        .with_status(400)
        .with_body(json!({ "error_code": "refresh_token_not_found", "msg": "Invalid Refresh Token" }).to_string())
        .create_async()
        .await;
    let logout = server
        .mock("POST", "/auth/v1/logout")
        .match_header("authorization", "Bearer remote-access")
        .with_status(204)
        .create_async()
        .await;
    let recover = server
        .mock("POST", "/auth/v1/recover")
        .match_body(Matcher::Json(json!({ "email": "dave@example.com" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let client = client(&server.url());

    assert_eq!(
        client.refresh_session("stale").await.unwrap_err(),
        RemoteIdentityError::InvalidToken
    );
    client.sign_out("remote-access").await.unwrap();
    client.recover("dave@example.com").await.unwrap();

    logout.assert_async().await;
    recover.assert_async().await;
}

#[tokio::test]
async fn test_update_password() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/auth/v1/user")
        .match_header("authorization", "Bearer recovery-token")
        .match_body(Matcher::Json(json!({ "password": "hunter44" })))
        .with_status(200)
        .with_body(user_json("sub-1", "dave@example.com").to_string())
        .create_async()
        .await;

    let user = client(&server.url())
        .update_password("recovery-token", "hunter44")
        .await
        .unwrap();

    assert_eq!(user.subject_id, "sub-1");
}

#[tokio::test]
async fn test_unresponsive_service_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    // Accept connections and never answer.
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = GoTrueClient::new(
        &format!("http://{}", address),
        ANON_KEY,
        Duration::from_millis(200),
    )
    .unwrap();

    let result = client.get_user("token").await;

    assert_eq!(result.unwrap_err(), RemoteIdentityError::Timeout(200));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let result = client(&format!("http://{}", address))
        .sign_in_with_password("dave@example.com", "hunter22")
        .await;

    assert!(matches!(result, Err(RemoteIdentityError::Unavailable(_))));
}
