//! Configuration validation.
//!
//! Serde handles syntax; this checks meaning. All problems are reported at
//! once, not just the first.

use axum::http::HeaderName;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::{
    GateConfig, GatekeeperConfig, KeyManConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig, TrustedRangesConfig,
};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Semantic validation of a configuration root.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for KeyManConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_listener(&self.listener, &mut errors);
        check_timeouts(&self.timeouts, &mut errors);
        check_observability(&self.observability, &mut errors);
        if self.store.key_file.as_os_str().is_empty() {
            errors.push(ValidationError::new("store.key_file", "must not be empty"));
        }
        if let Some(gate) = &self.gate {
            check_gate(gate, &mut errors);
            check_trusted_ranges(&self.trusted_ranges, &mut errors);
        }
        finish(errors)
    }
}

impl Validate for GatekeeperConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_listener(&self.listener, &mut errors);
        check_timeouts(&self.timeouts, &mut errors);
        check_observability(&self.observability, &mut errors);
        check_gate(&self.gate, &mut errors);
        check_trusted_ranges(&self.trusted_ranges, &mut errors);
        match url::Url::parse(&self.upstream.url) {
            Ok(url) if matches!(url.scheme(), "http") && url.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                "upstream.url",
                "must be an http:// URL with a host",
            )),
            Err(e) => errors.push(ValidationError::new("upstream.url", e.to_string())),
        }
        finish(errors)
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_listener(listener: &ListenerConfig, errors: &mut Vec<ValidationError>) {
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", listener.bind_address),
        ));
    }
    if listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }
    if let Some(tls) = &listener.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }
}

fn check_timeouts(timeouts: &TimeoutConfig, errors: &mut Vec<ValidationError>) {
    if timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
}

fn check_observability(observability: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }
}

fn check_gate(gate: &GateConfig, errors: &mut Vec<ValidationError>) {
    if gate.locked_ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::new(
            "gate.locked_ip",
            format!("{:?} is not an IP address", gate.locked_ip),
        ));
    }
    if HeaderName::try_from(gate.forwarded_header.as_str()).is_err() {
        errors.push(ValidationError::new(
            "gate.forwarded_header",
            format!("{:?} is not a valid header name", gate.forwarded_header),
        ));
    }
}

fn check_trusted_ranges(ranges: &TrustedRangesConfig, errors: &mut Vec<ValidationError>) {
    for (field, value) in [
        ("trusted_ranges.ipv4_url", &ranges.ipv4_url),
        ("trusted_ranges.ipv6_url", &ranges.ipv6_url),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
    if ranges.fetch_timeout_secs == 0 {
        errors.push(ValidationError::new("trusted_ranges.fetch_timeout_secs", "must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(KeyManConfig::default().validate().is_ok());
        assert!(GatekeeperConfig::default().validate().is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatekeeperConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.gate.locked_ip = "not-an-ip".into();
        config.gate.forwarded_header = "bad header".into();
        config.upstream.url = "ftp://example.com".into();
        config.timeouts.request_secs = 0;

        let errors = config.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "timeouts.request_secs",
                "gate.locked_ip",
                "gate.forwarded_header",
                "upstream.url",
            ]
        );
    }

    #[test]
    fn test_upstream_must_be_plain_http() {
        let mut config = GatekeeperConfig::default();
        config.upstream.url = "https://keymanager".into();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "upstream.url");

        config.upstream.url = "http://keymanager:9902".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gate_section_only_checked_when_present() {
        let mut config = KeyManConfig::default();
        config.trusted_ranges.ipv4_url = "not a url".into();
        assert!(config.validate().is_ok());

        config.gate = Some(GateConfig::default());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "trusted_ranges.ipv4_url");
    }
}
