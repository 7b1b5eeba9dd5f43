//! Integration tests for the engine client.
//!
//! Each test starts a throwaway HTTP responder on a loopback port that
//! answers requests from a fixed list and records every request head.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use regmirror_registry::{
    CredentialStore, EngineClient, EngineConfig, ImageClient, RegistryCredentials, RegistryError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request heads seen by the fake engine, in arrival order.
type Requests = Arc<Mutex<Vec<String>>>;

/// Starts a fake engine answering with `responses` in order.
async fn spawn_engine(responses: Vec<(u16, &'static str)>) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let mut responses: VecDeque<_> = responses.into();

    let seen = Arc::clone(&requests);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            seen.lock().push(String::from_utf8_lossy(&head).into_owned());

            let (status, body) = responses.pop_front().unwrap_or((500, "{\"message\":\"exhausted\"}"));
            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}

fn client(url: &str) -> EngineClient {
    EngineClient::new(EngineConfig::new(url)).unwrap()
}

fn request_line(requests: &Requests, index: usize) -> String {
    requests.lock()[index].lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_pull_success() {
    let stream = "{\"status\":\"Pulling from foo\",\"id\":\"1\"}\r\n{\"status\":\"Status: Downloaded newer image for foo:1\"}\r\n";
    let (url, requests) = spawn_engine(vec![(200, stream)]).await;

    client(&url).pull("docker.io/foo:1").await.unwrap();

    let line = request_line(&requests, 0);
    assert!(line.starts_with("POST /images/create?"), "{line}");
    assert!(line.contains("fromImage=docker.io%2Ffoo"), "{line}");
    assert!(line.contains("tag=1"), "{line}");
}

#[tokio::test]
async fn test_pull_uses_api_version_prefix() {
    let (url, requests) = spawn_engine(vec![(200, "")]).await;
    let client = EngineClient::new(EngineConfig::new(&url).with_api_version("1.41")).unwrap();

    client.pull("docker.io/foo:1").await.unwrap();

    assert!(request_line(&requests, 0).starts_with("POST /v1.41/images/create?"));
}

#[tokio::test]
async fn test_pull_missing_image() {
    let (url, _) = spawn_engine(vec![(
        404,
        "{\"message\":\"manifest for docker.io/foo:9 not found: manifest unknown\"}",
    )])
    .await;

    let err = client(&url).pull("docker.io/foo:9").await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_pull_stream_error_is_transient() {
    let stream = "{\"status\":\"Downloading\",\"id\":\"abc\"}\r\n{\"error\":\"unexpected EOF\",\"errorDetail\":{\"message\":\"unexpected EOF\"}}\r\n";
    let (url, _) = spawn_engine(vec![(200, stream)]).await;

    let err = client(&url).pull("docker.io/foo:1").await.unwrap_err();
    assert!(matches!(err, RegistryError::Stream { .. }), "{err}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_pull_sends_credentials() {
    let (url, requests) = spawn_engine(vec![(200, "")]).await;
    let config = EngineConfig::new(&url).with_credentials(
        CredentialStore::new().with("quay.io", RegistryCredentials::new("robot", "token")),
    );
    let client = EngineClient::new(config).unwrap();

    client.pull("quay.io/calico/node:v3").await.unwrap();

    let head = requests.lock()[0].to_lowercase();
    assert!(head.contains("x-registry-auth: "), "{head}");
}

#[tokio::test]
async fn test_tag_request() {
    let (url, requests) = spawn_engine(vec![(201, "")]).await;

    client(&url)
        .tag("docker.io/foo:1", "registry.local:9001/docker.io/foo:1")
        .await
        .unwrap();

    let line = request_line(&requests, 0);
    assert!(line.starts_with("POST /images/docker.io/foo:1/tag?"), "{line}");
    assert!(line.contains("repo=registry.local%3A9001%2Fdocker.io%2Ffoo"), "{line}");
}

#[tokio::test]
async fn test_tag_server_error_is_transient() {
    let (url, _) = spawn_engine(vec![(500, "{\"message\":\"driver failed\"}")]).await;

    let err = client(&url)
        .tag("docker.io/foo:1", "registry.local:9001/docker.io/foo:1")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Api { status: 500, .. }), "{err}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_push_without_credentials_reports_auth_failure() {
    let stream = "{\"status\":\"The push refers to repository [registry.local:9001/docker.io/foo]\"}\r\n{\"errorDetail\":{\"message\":\"no basic auth credentials\"},\"error\":\"no basic auth credentials\"}\r\n";
    let (url, requests) = spawn_engine(vec![(200, stream)]).await;

    let err = client(&url)
        .push("registry.local:9001/docker.io/foo:1")
        .await
        .unwrap_err();
    assert!(err.is_auth_failure(), "{err}");

    let head = requests.lock()[0].clone();
    assert!(head
        .lines()
        .next()
        .unwrap_or_default()
        .starts_with("POST /images/registry.local:9001/docker.io/foo/push?tag=1"));
    assert!(head.to_lowercase().contains("x-registry-auth: e30="), "{head}");
}

#[tokio::test]
async fn test_ping() {
    let (url, requests) = spawn_engine(vec![(200, "OK")]).await;

    client(&url).ping().await.unwrap();

    assert!(request_line(&requests, 0).starts_with("GET /_ping"));
}

#[tokio::test]
async fn test_unreachable_engine_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .pull("docker.io/foo:1")
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "{err}");
}
