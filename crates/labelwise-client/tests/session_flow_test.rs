//! Session behavior against a mock backend: login, 401 handling, read
//! retries, and cache freshness.

use labelwise_client::{AuthState, ClientConfig, ProjectAdmin, Session};
use labelwise_core::Error;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::default()
        .with_api_url(server.uri())
        .with_retry_delays(1, 5)
}

fn user_json(id: i64, is_superuser: bool) -> serde_json::Value {
    json!({
        "id": id,
        "email": "reviewer@example.com",
        "is_active": true,
        "is_superuser": is_superuser,
        "full_name": "Rae Viewer"
    })
}

/// Session restored from a token with `/users/me` answering `user`.
async fn logged_in_session(server: &MockServer, user: serde_json::Value) -> Session {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user))
        .mount(server)
        .await;
    let session = Session::new(&config(server).with_token(Some("tok-1".into()))).unwrap();
    session.restore().await.expect("restore should succeed");
    session
}

#[tokio::test]
async fn test_login_posts_form_and_loads_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login/access-token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=reviewer%40example.com"))
        .and(body_string_contains("password=s3cret-pass"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(3, false)))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(&config(&server)).unwrap();
    let user = session
        .login("reviewer@example.com", "s3cret-pass")
        .await
        .unwrap();

    assert_eq!(user.id, 3);
    assert_eq!(
        session.state(),
        AuthState::LoggedIn {
            user_id: 3,
            is_superuser: false
        }
    );
    assert_eq!(session.token().await.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_failed_login_surfaces_server_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login/access-token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Incorrect email or password"})),
        )
        .mount(&server)
        .await;

    let session = Session::new(&config(&server)).unwrap();
    let err = session.login("x@example.com", "wrong-pass").await.unwrap_err();

    assert_eq!(err.notice(), "Incorrect email or password");
    assert_eq!(session.state(), AuthState::LoggedOut);
}

#[tokio::test]
async fn test_read_401_logs_out_without_retry() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server, user_json(3, false)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session.clone());
    let err = admin.list().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert!(session.token().await.is_none());
    assert!(session.current_user().await.is_none());
    assert_eq!(session.cache().stats().await.entries, 0);

    // Without a token the next read never reaches the backend.
    let err = admin.list().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_read_500_retried_three_times() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server, user_json(3, false)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
        .expect(4)
        .mount(&server)
        .await;

    let err = ProjectAdmin::new(session.clone()).list().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 500, .. }));
    assert!(session.state().is_logged_in());
}

#[tokio::test]
async fn test_mutation_401_keeps_session() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server, user_json(1, true)).await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/projects/9"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = ProjectAdmin::new(session.clone()).delete(9).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(session.state().is_logged_in());
}

#[tokio::test]
async fn test_fresh_query_served_from_cache() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server, user_json(3, false)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "name": "Support chats", "description": null, "url": "https://data.example.com/a.jsonl", "owner_id": 1}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let admin = ProjectAdmin::new(session.clone());
    let first = admin.list().await.unwrap();
    let second = admin.list().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].name, "Support chats");

    let stats = session.cache().stats().await;
    assert!(stats.hits >= 1);
}

#[tokio::test]
async fn test_update_profile_sends_only_changes() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server, user_json(3, false)).await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/users/me"))
        .and(wiremock::matchers::body_json(json!({"full_name": "Rae V."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "email": "reviewer@example.com",
            "is_active": true,
            "is_superuser": false,
            "full_name": "Rae V."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = session
        .update_profile(Some("Rae V."), Some("reviewer@example.com"))
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Rae V."));
    assert_eq!(
        session.current_user().await.and_then(|u| u.full_name),
        Some("Rae V.".to_string())
    );

    // Nothing changed: no request.
    session
        .update_profile(Some("Rae V."), None)
        .await
        .unwrap();
}
