//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use keyman::config::{GateConfig, GatekeeperConfig, KeyManConfig, TrustedRangesConfig};
use keyman::lifecycle::startup;
use keyman::proxy::{GatekeeperServer, Upstream};
use keyman::{KeyServer, KeyStore, Shutdown};

/// A key service running on a loopback port.
pub struct RunningKeyMan {
    pub addr: SocketAddr,
    pub store: Arc<KeyStore>,
    pub shutdown: Shutdown,
}

impl RunningKeyMan {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start the key service with its snapshot at `key_file`.
pub async fn spawn_keyman(key_file: &Path) -> RunningKeyMan {
    let mut config = KeyManConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.store.key_file = key_file.to_path_buf();

    let (store, snapshot) = startup::open_store(&config.store).unwrap();
    let listener = startup::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = KeyServer::new(config, store.clone(), Some(snapshot), None);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningKeyMan {
        addr,
        store,
        shutdown,
    }
}

/// Serve `ipv4` at `/ips-v4` and `ipv6` at `/ips-v6` as plain text.
pub async fn start_range_server(ipv4: &'static str, ipv6: &'static str) -> SocketAddr {
    let app = Router::new()
        .route("/ips-v4", get(move || async move { ipv4 }))
        .route("/ips-v6", get(move || async move { ipv6 }))
        .route("/broken", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub fn ranges_from(server: SocketAddr) -> TrustedRangesConfig {
    TrustedRangesConfig {
        ipv4_url: format!("http://{server}/ips-v4"),
        ipv6_url: format!("http://{server}/ips-v6"),
        fetch_timeout_secs: 2,
        refresh_secs: 0,
    }
}

/// Start a gatekeeper in plain HTTP mode in front of `upstream`.
pub async fn spawn_gatekeeper(
    upstream: &str,
    locked_ip: &str,
    ranges: TrustedRangesConfig,
) -> (SocketAddr, Shutdown) {
    let mut config = GatekeeperConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.listener.tls = None;
    config.upstream.url = upstream.to_string();
    config.gate = GateConfig {
        locked_ip: locked_ip.to_string(),
        ..GateConfig::default()
    };
    config.trusted_ranges = ranges;

    let shutdown = Shutdown::new();
    let gate = startup::build_gate(&config.gate, &config.trusted_ranges, &shutdown)
        .await
        .unwrap();
    let upstream = Upstream::new(&config.upstream.url, Duration::from_secs(1)).unwrap();
    let listener = startup::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatekeeperServer::new(config, upstream, gate);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Requests in these tests have no body; the headers are enough.
                let mut buf = [0u8; 4096];
                let mut seen = Vec::new();
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
