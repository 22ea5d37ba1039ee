//! TCP endpoint parsing for `tcp://HOST:PORT` and `tcp://[IPv6]:PORT`.

use dq_core::{DqError, DqResult};

/// A concrete, bound-or-connected endpoint, as recorded in a wrapper's
/// endpoint set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointInfo {
    pub endpoint: String,
    pub host: String,
    pub port: u16,
}

/// Split a `tcp://host:port` (or `tcp://[ipv6]:port`) endpoint into its host
/// and port parts. The host is returned without brackets.
pub fn parse_tcp_endpoint(ep: &str) -> DqResult<(String, u16)> {
    if ep.is_empty() {
        return Err(DqError::invalid_argument("empty endpoint"));
    }
    let without_scheme = ep
        .strip_prefix("tcp://")
        .ok_or_else(|| DqError::invalid_argument(format!("not a tcp:// endpoint: {}", ep)))?;

    let (host, port_str) = without_scheme
        .rsplit_once(':')
        .ok_or_else(|| DqError::invalid_argument(format!("missing port in endpoint: {}", ep)))?;

    let port: u16 = port_str
        .parse()
        .map_err(|_| DqError::invalid_argument(format!("cannot parse port in endpoint: {}", ep)))?;
    if port == 0 {
        return Err(DqError::invalid_argument(format!("invalid port in endpoint: {}", ep)));
    }

    let host = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
    if host.is_empty() {
        return Err(DqError::invalid_argument(format!("missing host in endpoint: {}", ep)));
    }

    Ok((host.to_string(), port))
}

/// Wrap `host` in brackets if it looks like an IPv6 literal (contains `:`
/// and isn't already bracketed), for embedding in a `tcp://` endpoint.
pub fn bracket_if_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}
