//! Configuration schema definitions.
//!
//! Both binaries read a TOML file into one of the root types below. Every
//! field has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::gate::DEFAULT_FORWARDED_HEADER;

/// Root configuration of the key service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyManConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Snapshot file location.
    pub store: StoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Optional gate directly in front of the key service.
    pub gate: Option<GateConfig>,

    /// Trusted ranges, only fetched when `gate` is set.
    pub trusted_ranges: TrustedRangesConfig,
}

impl Default for KeyManConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::with_bind("0.0.0.0:9902"),
            store: StoreConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            gate: None,
            trusted_ranges: TrustedRangesConfig::default(),
        }
    }
}

/// Root configuration of the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Locked identity and forwarded header.
    pub gate: GateConfig,

    /// Where the trusted ranges come from.
    pub trusted_ranges: TrustedRangesConfig,

    /// Service receiving authorized traffic.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig {
                tls: Some(TlsConfig::default()),
                ..ListenerConfig::with_bind("0.0.0.0:9901")
            },
            gate: GateConfig::default(),
            trusted_ranges: TrustedRangesConfig::default(),
            upstream: UpstreamConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9902").
    pub bind_address: String,

    /// Optional TLS configuration; plain HTTP when absent.
    pub tls: Option<TlsConfig>,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    fn with_bind(bind_address: &str) -> Self {
        Self {
            bind_address: bind_address.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9902".to_string(),
            tls: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./RJcert.crt"),
            key_path: PathBuf::from("./RJsecret.key"),
        }
    }
}

/// Snapshot file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding the persisted keys.
    pub key_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from("./creds/keys.json"),
        }
    }
}

/// Who may pass the gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// The single client address allowed through.
    pub locked_ip: String,

    /// Header in which the edge network passes the client address.
    pub forwarded_header: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            locked_ip: "104.196.23.77".to_string(),
            forwarded_header: DEFAULT_FORWARDED_HEADER.to_string(),
        }
    }
}

/// Sources of the trusted range lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrustedRangesConfig {
    /// Newline-delimited IPv4 CIDR list.
    pub ipv4_url: String,

    /// Newline-delimited IPv6 CIDR list.
    pub ipv6_url: String,

    /// Timeout for each list fetch in seconds.
    pub fetch_timeout_secs: u64,

    /// Re-fetch interval in seconds; 0 fetches once at startup only.
    pub refresh_secs: u64,
}

impl Default for TrustedRangesConfig {
    fn default() -> Self {
        Self {
            ipv4_url: "https://www.cloudflare.com/ips-v4".to_string(),
            ipv6_url: "https://www.cloudflare.com/ips-v6".to_string(),
            fetch_timeout_secs: 10,
            refresh_secs: 0,
        }
    }
}

/// Reverse proxy target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL authorized requests are forwarded to.
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://keymanager".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines instead of human readable ones.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "keyman=info,gatekeeper=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
