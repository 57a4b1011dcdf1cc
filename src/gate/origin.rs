//! Origin resolution: the address a request actually came from.

use axum::http::HeaderMap;

/// Reduce a raw peer address to its host part.
///
/// Accepts `host:port`, `[v6]:port` or a bare host. When the value is a
/// `", "`-separated list only the first entry counts. Anything that does not
/// split cleanly into host and port is returned as-is.
pub fn resolve_origin(raw: &str) -> &str {
    let first = raw.split(", ").next().unwrap_or(raw);
    match split_host_port(first) {
        Some((host, _port)) => host,
        None => first,
    }
}

/// Split `host:port` / `[host]:port`. `None` when there is no port, or when a
/// bare host contains more than one colon (an unbracketed IPv6 address).
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = after.strip_prefix(':')?;
        if host.contains('[') || port.contains(':') {
            return None;
        }
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') || host.contains('[') || host.contains(']') {
        return None;
    }
    Some((host, port))
}

/// The forwarded-identity header value, or `""` when absent or not text.
pub fn forwarded_identity<'a>(headers: &'a HeaderMap, header: &str) -> &'a str {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
