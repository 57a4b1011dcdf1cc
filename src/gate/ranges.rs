//! Trusted network ranges (the edge network's published CIDR lists).
//!
//! # Responsibilities
//! - Parse newline-delimited CIDR lists
//! - Fetch the IPv4 and IPv6 lists over HTTP
//! - Answer "is this address inside a trusted range"
//! - Optionally re-fetch on an interval, keeping the old set on failure

use arc_swap::ArcSwap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::TrustedRangesConfig;
use crate::observability::metrics;

/// Error parsing a single CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("missing '/' in CIDR block {0:?}")]
    MissingPrefix(String),

    #[error("invalid network address in {0:?}")]
    InvalidAddress(String),

    #[error("invalid prefix length in {0:?}")]
    InvalidPrefix(String),
}

/// Failure to build the trusted range set.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("bad entry in {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: RangeParseError,
    },
}

/// A network range such as `103.21.244.0/22` or `2400:cb00::/32`.
///
/// The stored address is already masked to the network boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Option<Self> {
        let network = match addr {
            IpAddr::V4(v4) if prefix_len <= 32 => {
                IpAddr::from((u32::from(v4) & v4_mask(prefix_len)).to_be_bytes())
            }
            IpAddr::V6(v6) if prefix_len <= 128 => {
                IpAddr::from((u128::from(v6) & v6_mask(prefix_len)).to_be_bytes())
            }
            _ => return None,
        };
        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Whether `addr` falls inside this range.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) match IPv4 ranges.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = v4_mask(self.prefix_len);
                u32::from(ip) & mask == u32::from(net)
            }
            (IpAddr::V4(_), IpAddr::V6(ip)) => ip
                .to_ipv4_mapped()
                .is_some_and(|v4| self.contains(IpAddr::V4(v4))),
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = v6_mask(self.prefix_len);
                u128::from(ip) & mask == u128::from(net)
            }
            (IpAddr::V6(_), IpAddr::V4(_)) => false,
        }
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0)
}

fn v6_mask(prefix_len: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0)
}

impl FromStr for Cidr {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| RangeParseError::MissingPrefix(s.to_string()))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| RangeParseError::InvalidAddress(s.to_string()))?;
        // Only plain decimal digits: no sign, no whitespace.
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RangeParseError::InvalidPrefix(s.to_string()));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| RangeParseError::InvalidPrefix(s.to_string()))?;
        Cidr::new(addr, prefix_len).ok_or_else(|| RangeParseError::InvalidPrefix(s.to_string()))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Parse a newline-delimited list of CIDR blocks. Blank lines are skipped.
pub fn parse_range_list(body: &str) -> Result<Vec<Cidr>, RangeParseError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::parse)
        .collect()
}

/// The set of ranges whose connections may vouch for a forwarded identity.
///
/// Readers see a consistent set at all times; a refresh swaps the whole set.
#[derive(Debug)]
pub struct TrustedRanges {
    ranges: ArcSwap<Vec<Cidr>>,
}

impl TrustedRanges {
    pub fn from_ranges(ranges: Vec<Cidr>) -> Self {
        metrics::record_trusted_ranges(ranges.len());
        Self {
            ranges: ArcSwap::from_pointee(ranges),
        }
    }

    /// Fetch both lists once. Any fetch or parse failure is an error.
    pub async fn load(config: &TrustedRangesConfig) -> Result<Self, RegistryError> {
        let client = fetch_client(config)?;
        let ranges = fetch_ranges(&client, config).await?;
        tracing::info!(ranges = ranges.len(), "Trusted ranges loaded");
        Ok(Self::from_ranges(ranges))
    }

    /// Whether the textual address is inside any trusted range.
    /// Unparsable input is simply not trusted.
    pub fn contains_str(&self, addr: &str) -> bool {
        addr.parse::<IpAddr>()
            .map(|ip| self.contains(ip))
            .unwrap_or(false)
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.ranges.load().iter().any(|range| range.contains(addr))
    }

    pub fn len(&self) -> usize {
        self.ranges.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.load().is_empty()
    }

    pub fn replace(&self, ranges: Vec<Cidr>) {
        metrics::record_trusted_ranges(ranges.len());
        self.ranges.store(Arc::new(ranges));
    }

    /// Re-fetch the lists every `refresh_secs` until shutdown.
    ///
    /// Does nothing when refreshing is disabled (`refresh_secs == 0`).
    pub async fn refresh_loop(
        self: Arc<Self>,
        config: TrustedRangesConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        if config.refresh_secs == 0 {
            tracing::debug!("Trusted range refresh disabled");
            return;
        }

        let client = match fetch_client(&config) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Trusted range refresh could not start");
                return;
            }
        };

        let period = Duration::from_secs(config.refresh_secs);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match fetch_ranges(&client, &config).await {
                        Ok(ranges) => {
                            tracing::info!(ranges = ranges.len(), "Trusted ranges refreshed");
                            self.replace(ranges);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Trusted range refresh failed; keeping previous set");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Trusted range refresh stopping");
                    return;
                }
            }
        }
    }
}

fn fetch_client(config: &TrustedRangesConfig) -> Result<reqwest::Client, RegistryError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
        .map_err(|source| RegistryError::Fetch {
            url: String::new(),
            source,
        })
}

async fn fetch_ranges(
    client: &reqwest::Client,
    config: &TrustedRangesConfig,
) -> Result<Vec<Cidr>, RegistryError> {
    let mut ranges = Vec::new();
    for url in [&config.ipv4_url, &config.ipv6_url] {
        ranges.extend(fetch_list(client, url).await?);
    }
    Ok(ranges)
}

async fn fetch_list(client: &reqwest::Client, url: &str) -> Result<Vec<Cidr>, RegistryError> {
    let fetch_err = |source| RegistryError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(fetch_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(RegistryError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().await.map_err(fetch_err)?;
    let ranges = parse_range_list(&body).map_err(|source| RegistryError::Parse {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!(url = %url, ranges = ranges.len(), "Fetched trusted range list");
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_masks_host_bits() {
        let cidr: Cidr = "103.21.245.7/22".parse().unwrap();
        assert_eq!(cidr.to_string(), "103.21.244.0/22");

        let cidr: Cidr = "2400:cb00:1::1/32".parse().unwrap();
        assert_eq!(cidr.to_string(), "2400:cb00::/32");
    }

    #[test]
    fn test_parse_rejects_bad_blocks() {
        assert!(matches!(
            "10.0.0.0".parse::<Cidr>(),
            Err(RangeParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "10.0.0/8".parse::<Cidr>(),
            Err(RangeParseError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Cidr>(),
            Err(RangeParseError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "10.0.0.0/+8".parse::<Cidr>(),
            Err(RangeParseError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "::/129".parse::<Cidr>(),
            Err(RangeParseError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_contains() {
        let v4: Cidr = "103.21.244.0/22".parse().unwrap();
        assert!(v4.contains("103.21.244.1".parse().unwrap()));
        assert!(v4.contains("103.21.247.255".parse().unwrap()));
        assert!(!v4.contains("103.21.248.0".parse().unwrap()));
        assert!(v4.contains("::ffff:103.21.244.1".parse().unwrap()));

        let v6: Cidr = "2400:cb00::/32".parse().unwrap();
        assert!(v6.contains("2400:cb00:abcd::1".parse().unwrap()));
        assert!(!v6.contains("2400:cb01::1".parse().unwrap()));
        assert!(!v6.contains("103.21.244.1".parse().unwrap()));

        let everything: Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(everything.contains("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_parse_range_list_skips_blank_lines() {
        let ranges = parse_range_list("173.245.48.0/20\n\n103.21.244.0/22\n").unwrap();
        assert_eq!(ranges.len(), 2);

        let ranges = parse_range_list("173.245.48.0/20\r\n2400:cb00::/32\r\n").unwrap();
        assert_eq!(ranges.len(), 2);

        assert!(parse_range_list("173.245.48.0/20\ngarbage\n").is_err());
        assert!(parse_range_list("").unwrap().is_empty());
    }

    #[test]
    fn test_trusted_ranges_lookup_and_replace() {
        let trusted = TrustedRanges::from_ranges(parse_range_list("103.21.244.0/22").unwrap());
        assert!(trusted.contains_str("103.21.244.1"));
        assert!(!trusted.contains_str("192.168.1.2"));
        assert!(!trusted.contains_str("not-an-ip"));
        assert!(!trusted.contains_str("103.21.244.1:443"));

        trusted.replace(parse_range_list("192.168.0.0/16").unwrap());
        assert!(trusted.contains_str("192.168.1.2"));
        assert!(!trusted.contains_str("103.21.244.1"));
        assert_eq!(trusted.len(), 1);
    }
}
