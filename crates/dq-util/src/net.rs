//! Hostname and local-address helpers used to expand wildcard bind hosts
//! (`*`, `0.0.0.0`) into concrete endpoints, and to find a free TCP port for
//! ephemeral listeners.

use dq_core::{DqError, DqResult};
use std::net::{IpAddr, TcpListener};

/// This machine's hostname, as reported by the OS.
pub fn own_hostname() -> DqResult<String> {
    let mut buf = vec![0u8; 256];
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return Err(DqError::internal("gethostname() failed"));
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec())
        .map_err(|_| DqError::internal("hostname is not valid utf-8"))
}

/// Every IP address bound to a local interface, optionally including the
/// loopback interface.
pub fn own_ips(include_loopback: bool) -> DqResult<Vec<IpAddr>> {
    let ifaces = if_addrs::get_if_addrs()
        .map_err(|e| DqError::internal(format!("failed to enumerate interfaces: {}", e)))?;
    Ok(ifaces
        .into_iter()
        .filter(|iface| include_loopback || !iface.is_loopback())
        .map(|iface| iface.ip())
        .collect())
}

/// True if `hostname` is the wildcard meaning "all local interfaces":
/// either empty or the literal `*`.
pub fn is_wildcard_host(hostname: &str) -> bool {
    hostname.is_empty() || hostname == "*" || hostname == "0.0.0.0"
}

/// Find one unused TCP port, bound on `hostname` (or all interfaces for the
/// wildcard host).
pub fn find_unused_tcp_port(hostname: &str) -> DqResult<u16> {
    Ok(find_unused_tcp_ports(1, hostname)?[0])
}

/// Find `count` unused TCP ports. Each is found by binding a throwaway
/// listener to port 0 and reading back the OS-assigned port, then dropping
/// the listener immediately; a concurrent bind could in principle reuse the
/// port before the caller gets to it, same as the system call this wraps.
pub fn find_unused_tcp_ports(count: usize, hostname: &str) -> DqResult<Vec<u16>> {
    let bind_addr = if is_wildcard_host(hostname) {
        "0.0.0.0".to_string()
    } else {
        hostname.to_string()
    };

    let mut ports = Vec::with_capacity(count);
    for _ in 0..count {
        let listener = TcpListener::bind((bind_addr.as_str(), 0))
            .map_err(|e| DqError::internal(format!("bind failed on {}: {}", bind_addr, e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| DqError::internal(format!("local_addr failed: {}", e)))?
            .port();
        ports.push(port);
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_hostname_is_non_empty() {
        let name = own_hostname().unwrap();
        assert!(!name.is_empty());
    }

    #[test]
    fn wildcard_recognition() {
        assert!(is_wildcard_host(""));
        assert!(is_wildcard_host("*"));
        assert!(is_wildcard_host("0.0.0.0"));
        assert!(!is_wildcard_host("db1.internal"));
    }

    #[test]
    fn find_unused_tcp_port_returns_a_bindable_port() {
        let port = find_unused_tcp_port("127.0.0.1").unwrap();
        assert!(port > 0);
        // the listener was dropped, so this port should be free again
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn find_unused_tcp_ports_returns_distinct_ports() {
        let ports = find_unused_tcp_ports(4, "127.0.0.1").unwrap();
        assert_eq!(ports.len(), 4);
        let mut sorted = ports.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ports.len());
    }

    #[test]
    fn own_ips_without_loopback_excludes_127_0_0_1() {
        let ips = own_ips(false).unwrap();
        assert!(!ips.iter().any(|ip| ip.is_loopback()));
    }
}
