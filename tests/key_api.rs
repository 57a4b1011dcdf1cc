//! End-to-end tests of the key routes over real sockets.

use keyman_sdk::{ClientError, KeyManClient};
use reqwest::StatusCode;
use std::collections::HashMap;

mod common;

fn read_snapshot(path: &std::path::Path) -> HashMap<String, String> {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_crud_lifecycle_is_mirrored_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("creds").join("keys.json");
    let server = common::spawn_keyman(&key_file).await;
    let client = KeyManClient::new(&server.url());

    // Missing snapshot file is created with an empty object.
    assert!(read_snapshot(&key_file).is_empty());

    client.create("github", "token-1").await.unwrap();
    assert_eq!(client.get("github").await.unwrap(), "token-1");
    assert_eq!(read_snapshot(&key_file)["github"], "token-1");

    client.update("github", "token-2").await.unwrap();
    assert_eq!(client.get("github").await.unwrap(), "token-2");
    assert_eq!(read_snapshot(&key_file)["github"], "token-2");

    client.delete("github").await.unwrap();
    assert!(read_snapshot(&key_file).is_empty());

    let err = client.get("github").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rejected { status, ref message }
            if status == StatusCode::BAD_REQUEST && message == "the key provided does not exist"
    ));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_rejections_leave_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("keys.json");
    let server = common::spawn_keyman(&key_file).await;
    let client = KeyManClient::new(&server.url());

    client.create("a", "1").await.unwrap();

    let conflict = client.create("a", "2").await.unwrap_err();
    assert!(matches!(conflict, ClientError::Rejected { ref message, .. }
        if message == "the key provided for creation already exists"));

    let invalid = client.create("has space", "x").await.unwrap_err();
    assert!(matches!(invalid, ClientError::Rejected { status, .. } if status == StatusCode::BAD_REQUEST));

    let missing = client.update("nope", "x").await.unwrap_err();
    assert!(matches!(missing, ClientError::Rejected { ref message, .. }
        if message == "the key provided does not exist"));

    assert_eq!(server.store.snapshot(), HashMap::from([("a".to_string(), "1".to_string())]));
    assert_eq!(read_snapshot(&key_file), server.store.snapshot());

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_get_many_returns_only_existing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::spawn_keyman(&dir.path().join("keys.json")).await;
    let client = KeyManClient::new(&server.url());

    client.create("x", "1").await.unwrap();
    client.create("y", "2").await.unwrap();

    let pairs = client
        .get_many(&["x".to_string(), "missing".to_string(), "y".to_string()])
        .await
        .unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs["x"], "1");
    assert_eq!(pairs["y"], "2");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_existing_snapshot_is_loaded_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("keys.json");
    std::fs::write(&key_file, r#"{"preloaded":"yes"}"#).unwrap();

    let server = common::spawn_keyman(&key_file).await;
    let client = KeyManClient::new(&server.url());
    assert_eq!(client.get("preloaded").await.unwrap(), "yes");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_route_and_malformed_body() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::spawn_keyman(&dir.path().join("keys.json")).await;
    let http = reqwest::Client::new();

    let res = http.get(format!("{}/nothing/here", server.url())).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["msg"], "could not find a handler for the provided request");

    let res = http
        .post(format!("{}/key", server.url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["msg"], "could not unmarshall JSON");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_route_listing() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::spawn_keyman(&dir.path().join("keys.json")).await;
    let client = KeyManClient::new(&server.url());

    let routes = client.routes().await.unwrap();
    assert_eq!(routes.len(), 6);
    assert!(routes.iter().any(|r| r.starts_with("POST") && r.contains("/keys")));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_creates_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let key_file = dir.path().join("keys.json");
    let server = common::spawn_keyman(&key_file).await;
    let url = server.url();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let client = KeyManClient::new(&url);
            tokio::spawn(async move { client.create(&format!("key{i}"), &i.to_string()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(server.store.len(), 32);
    let on_disk = read_snapshot(&key_file);
    assert_eq!(on_disk.len(), 32);
    assert_eq!(on_disk["key7"], "7");

    server.shutdown.trigger();
}
