//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order: store and trusted ranges before listeners

use axum::http::HeaderName;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GateConfig, StoreConfig, TrustedRangesConfig};
use crate::gate::{AccessGate, RegistryError, TrustedRanges};
use crate::lifecycle::Shutdown;
use crate::store::{KeyStore, SnapshotFile, StoreError};

/// Errors that stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("key store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("trusted ranges unavailable: {0}")]
    RegistryUnavailable(#[from] RegistryError),

    #[error("invalid forwarded header {0:?}")]
    ForwardedHeader(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[source] io::Error),

    #[error("invalid upstream: {0}")]
    Upstream(String),

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Open the snapshot file (creating it when missing) and load the store.
pub fn open_store(config: &StoreConfig) -> Result<(Arc<KeyStore>, SnapshotFile), StartupError> {
    let store = Arc::new(KeyStore::new());
    let snapshot = SnapshotFile::new(&config.key_file);
    snapshot.open_or_create(&store)?;
    Ok((store, snapshot))
}

/// Fetch the trusted ranges and build the gate. Starts the refresh task when
/// a refresh interval is configured.
pub async fn build_gate(
    gate: &GateConfig,
    ranges: &TrustedRangesConfig,
    shutdown: &Shutdown,
) -> Result<Arc<AccessGate>, StartupError> {
    let header = HeaderName::try_from(gate.forwarded_header.as_str())
        .map_err(|_| StartupError::ForwardedHeader(gate.forwarded_header.clone()))?;

    let trusted = Arc::new(TrustedRanges::load(ranges).await?);
    if ranges.refresh_secs > 0 {
        tokio::spawn(trusted.clone().refresh_loop(ranges.clone(), shutdown.subscribe()));
    }

    tracing::info!(
        locked_ip = %gate.locked_ip,
        forwarded_header = %header,
        trusted_ranges = trusted.len(),
        refresh_secs = ranges.refresh_secs,
        "Access gate ready"
    );
    Ok(Arc::new(AccessGate::new(gate.locked_ip.clone(), header, trusted)))
}

pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
