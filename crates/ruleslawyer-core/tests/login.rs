use std::sync::Arc;

use mockito::{Matcher, Server};
use reqwest::Client;
use ruleslawyer_core::auth::CredentialStore;
use ruleslawyer_core::{ApiError, FileStore, MemoryStore, RequestOptions, RulesLawyer};
use serde_json::json;

fn lawyer(url: &str, store: Arc<MemoryStore>) -> RulesLawyer {
    let lawyer = RulesLawyer::with_client(Client::new(), url, store);
    lawyer.initialize().unwrap();
    lawyer
}

#[tokio::test]
async fn test_wrong_password_reports_detail() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "username": "bob", "password": "wrongpass" })))
        .with_status(400)
        .with_body(r#"{"detail": "Invalid credentials"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let lawyer = lawyer(&server.url(), store.clone());
    let err = lawyer.login("bob", "wrongpass").await.unwrap_err();

    assert!(matches!(err, ApiError::LoginFailed(ref reason) if reason == "Invalid credentials"));
    assert!(!lawyer.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_successful_login_authenticates_later_requests() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(json!({ "username": "bob", "password": "correctpass" })))
        .with_status(200)
        .with_body(r#"{"access_token": "tok-1", "token_type": "bearer"}"#)
        .create_async()
        .await;
    let query = server
        .mock("GET", "/query")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let lawyer = lawyer(&server.url(), store.clone());
    lawyer.login("bob", "correctpass").await.unwrap();

    assert!(lawyer.is_authenticated());
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));

    lawyer.request("/query", RequestOptions::get()).await.unwrap();
    lawyer.request("/query", RequestOptions::get()).await.unwrap();
    query.assert_async().await;
}

#[tokio::test]
async fn test_login_persists_across_restart() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(r#"{"access_token": "tok-1"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let first = RulesLawyer::with_client(
        Client::new(),
        server.url(),
        Arc::new(FileStore::new(dir.path().to_path_buf())),
    );
    first.initialize().unwrap();
    first.login("bob", "correctpass").await.unwrap();
    drop(first);

    let second = RulesLawyer::with_client(
        Client::new(),
        server.url(),
        Arc::new(FileStore::new(dir.path().to_path_buf())),
    );
    second.initialize().unwrap();
    assert!(second.is_authenticated());
}

#[tokio::test]
async fn test_missing_access_token_is_a_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(r#"{"token_type": "bearer"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let lawyer = lawyer(&server.url(), store.clone());
    let err = lawyer.login("bob", "correctpass").await.unwrap_err();

    assert!(matches!(err, ApiError::LoginFailed(_)));
    assert!(!lawyer.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_failure_without_detail_is_generic() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let lawyer = lawyer(&server.url(), Arc::new(MemoryStore::new()));
    let err = lawyer.login("bob", "correctpass").await.unwrap_err();
    assert_eq!(err.to_string(), "Login failed");
}

#[tokio::test]
async fn test_rejected_login_keeps_existing_session() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("www-authenticate", "Bearer")
        .with_body(r#"{"detail": "Incorrect username or password"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let lawyer = lawyer(&server.url(), store.clone());
    let err = lawyer.login("bob", "wrongpass").await.unwrap_err();

    assert_eq!(err.to_string(), "Incorrect username or password");
    assert!(!err.requires_login());
    assert!(lawyer.is_authenticated());
    assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_failure_during_login() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = Arc::new(MemoryStore::new());
    let lawyer = lawyer(&url, store.clone());
    let err = lawyer.login("bob", "correctpass").await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.to_string().starts_with("Network error"));
    assert!(!lawyer.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_logout_makes_no_request() {
    let mut server = Server::new_async().await;
    let post = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let get = server.mock("GET", Matcher::Any).expect(0).create_async().await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let lawyer = lawyer(&server.url(), store.clone());
    lawyer.logout().unwrap();

    assert!(!lawyer.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
    post.assert_async().await;
    get.assert_async().await;
}
