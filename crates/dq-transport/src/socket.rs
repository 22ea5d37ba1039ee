//! A validity-gated wrapper around a `zmq::Socket`.
//!
//! Tracks the set of endpoints currently bound/connected and a `valid` flag
//! that flips on the first successful bind/connect and back to false after
//! `disconnect_all`. Waiters block on a condition variable rather than
//! busy-polling, the same pattern as `dq_sync::Barrier`.

use crate::endpoint::{bracket_if_ipv6, parse_tcp_endpoint, EndpointInfo};
use dq_core::{DqError, DqResult};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

const SEND_RETRIES: u32 = 10;
const SEND_RETRY_STEP_MS: u64 = 100;
const WAIT_VALID_POLL: Duration = Duration::from_millis(100);

struct State {
    endpoints: HashSet<EndpointInfo>,
    valid: bool,
    stop: bool,
    n_waiting: usize,
}

/// Wraps a `zmq::Socket`, exposing bind/connect helpers that expand wildcard
/// hosts into concrete per-IP endpoints and a retrying `send`.
pub struct SocketWrapper {
    socket: Mutex<zmq::Socket>,
    state: Mutex<State>,
    cond: Condvar,
}

impl SocketWrapper {
    pub fn new(ctx: &zmq::Context, socket_type: zmq::SocketType) -> DqResult<Self> {
        let socket = ctx
            .socket(socket_type)
            .map_err(|e| DqError::transport(format!("socket() failed: {}", e)))?;
        Ok(Self {
            socket: Mutex::new(socket),
            state: Mutex::new(State {
                endpoints: HashSet::new(),
                valid: false,
                stop: false,
                n_waiting: 0,
            }),
            cond: Condvar::new(),
        })
    }

    pub fn valid(&self) -> bool {
        self.state.lock().unwrap().valid
    }

    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.state.lock().unwrap().endpoints.iter().cloned().collect()
    }

    fn set_valid(&self) {
        let mut state = self.state.lock().unwrap();
        state.valid = true;
        self.cond.notify_all();
    }

    fn set_invalid(&self) {
        let mut state = self.state.lock().unwrap();
        state.valid = false;
    }

    /// Bind to `addr`. For a `tcp://` address, reads back the actual bound
    /// endpoint via `ZMQ_LAST_ENDPOINT` (resolving a wildcard `*` port), and
    /// if the bound host is `0.0.0.0`, records one endpoint per local IP.
    /// Returns the first endpoint recorded as the representative result.
    pub fn bind(&self, addr: &str) -> DqResult<EndpointInfo> {
        {
            let socket = self.socket.lock().unwrap();
            socket
                .bind(addr)
                .map_err(|e| DqError::transport(format!("bind({}) failed: {}", addr, e)))?;
        }
        self.set_valid();

        if !addr.starts_with("tcp://") {
            let info = EndpointInfo {
                endpoint: addr.to_string(),
                host: addr.to_string(),
                port: 0,
            };
            self.state.lock().unwrap().endpoints.insert(info.clone());
            return Ok(info);
        }

        let last_endpoint = {
            let socket = self.socket.lock().unwrap();
            socket
                .get_last_endpoint()
                .map_err(|e| DqError::transport(format!("get_last_endpoint failed: {}", e)))?
                .map_err(|_| DqError::transport("last endpoint is not valid utf-8"))?
        };
        let (host, port) = parse_tcp_endpoint(&last_endpoint)?;

        let resolved_hosts = if host == "0.0.0.0" {
            dq_util::net::own_ips(true)?
                .into_iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
        } else {
            vec![host]
        };

        let mut first = None;
        let mut state = self.state.lock().unwrap();
        for h in resolved_hosts {
            let endpoint = format!("tcp://{}:{}", bracket_if_ipv6(&h), port);
            let info = EndpointInfo {
                endpoint,
                host: h,
                port,
            };
            state.endpoints.insert(info.clone());
            if first.is_none() {
                first = Some(info);
            }
        }
        first.ok_or_else(|| DqError::internal("bind produced no endpoints"))
    }

    /// Bind on every host in `hosts`, wrapping IPv6 literals in brackets and
    /// using a wildcard port, logging and continuing on a per-host failure.
    pub fn batch_tcp_bind(&self, hosts: &[String]) -> Vec<(String, Result<EndpointInfo, DqError>)> {
        let mut results = Vec::with_capacity(hosts.len());
        for host in hosts {
            if host.is_empty() {
                continue;
            }
            let addr = format!("tcp://{}:*", bracket_if_ipv6(host));
            let outcome = self.bind(&addr);
            if let Err(ref e) = outcome {
                log::error!("failed to bind to host {}: {}", host, e);
            }
            results.push((host.clone(), outcome));
        }
        results
    }

    /// Re-bind to every endpoint in `endpoints`, optionally binding at most
    /// once per distinct host. Returns true iff at least one bind succeeded.
    pub fn batch_ep_rebind(&self, endpoints: &[String], same_host_once: bool) -> bool {
        let mut seen_hosts = HashSet::new();
        let mut any_ok = false;
        for ep in endpoints {
            if same_host_once {
                if let Ok((host, _)) = parse_tcp_endpoint(ep) {
                    if !seen_hosts.insert(host) {
                        continue;
                    }
                }
            }
            match self.bind(ep) {
                Ok(_) => any_ok = true,
                Err(e) => log::error!("failed to rebind to {}: {}", ep, e),
            }
        }
        any_ok
    }

    pub fn connect(&self, addr: &str) -> DqResult<()> {
        {
            let socket = self.socket.lock().unwrap();
            socket
                .connect(addr)
                .map_err(|e| DqError::transport(format!("connect({}) failed: {}", addr, e)))?;
        }
        self.state.lock().unwrap().endpoints.insert(EndpointInfo {
            endpoint: addr.to_string(),
            host: addr.to_string(),
            port: 0,
        });
        self.set_valid();
        Ok(())
    }

    pub fn reconnect(&self, addr: &str) -> DqResult<()> {
        self.disconnect_all();
        self.connect(addr)
    }

    pub fn disconnect_all(&self) {
        let endpoints: Vec<EndpointInfo> = {
            let mut state = self.state.lock().unwrap();
            state.endpoints.drain().collect()
        };
        let socket = self.socket.lock().unwrap();
        for ep in endpoints {
            if let Err(e) = socket.disconnect(&ep.endpoint) {
                log::debug!("disconnect({}) failed: {}", ep.endpoint, e);
            }
        }
        self.set_invalid();
    }

    /// Send `buf`. Waits briefly for validity if currently invalid, then
    /// retries the underlying send up to 10 times with linearly increasing
    /// backoff on failure.
    pub fn send(&self, buf: &[u8], flags: i32) -> DqResult<()> {
        if !self.valid() && !self.wait_valid(Some(SEND_RETRY_STEP_MS)) {
            log::error!("send: socket is not valid");
            return Err(DqError::transport("socket not valid"));
        }

        let mut last_err = None;
        for attempt in 1..=SEND_RETRIES {
            let result = {
                let socket = self.socket.lock().unwrap();
                socket.send(buf, flags)
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!("send attempt {} failed: {}", attempt, e);
                    last_err = Some(e);
                    std::thread::sleep(Duration::from_millis(SEND_RETRY_STEP_MS * attempt as u64));
                }
            }
        }
        Err(DqError::transport(format!(
            "send failed after {} attempts: {}",
            SEND_RETRIES,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Block until valid or `ms` elapses (or forever if `ms` is `None`).
    /// Returns current validity. A concurrent `stop()` releases immediately.
    pub fn wait_valid(&self, ms: Option<u64>) -> bool {
        let deadline = ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut state = self.state.lock().unwrap();
        if state.valid {
            return true;
        }
        state.n_waiting += 1;

        loop {
            if state.valid || state.stop {
                break;
            }
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let step = (deadline - now).min(WAIT_VALID_POLL);
                let (guard, _) = self.cond.wait_timeout(state, step).unwrap();
                state = guard;
            } else {
                let (guard, _) = self.cond.wait_timeout(state, WAIT_VALID_POLL).unwrap();
                state = guard;
            }
        }
        state.n_waiting -= 1;
        self.cond.notify_all();
        state.valid
    }

    /// Single poll for read-readiness. Returns false immediately if invalid.
    pub fn poll_in(&self, ms: i64) -> DqResult<bool> {
        if !self.valid() {
            return Ok(false);
        }
        let socket = self.socket.lock().unwrap();
        let events = socket
            .poll(zmq::POLLIN, ms)
            .map_err(|e| DqError::transport(format!("poll failed: {}", e)))?;
        Ok(events & zmq::POLLIN != 0)
    }

    /// Sanitize a candidate subscription key: thin wrapper over
    /// `dq_util::subscription::sanitize`.
    pub fn valid_subscription(&self, bytes: &[u8]) -> Vec<u8> {
        dq_util::subscription::sanitize(bytes)
    }

    /// Signal shutdown, wake every waiter, and block until no thread remains
    /// inside `wait_valid`.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.stop = true;
            self.cond.notify_all();
        }
        let state = self.state.lock().unwrap();
        let _unblocked = self
            .cond
            .wait_while(state, |s| s.n_waiting > 0)
            .unwrap();
    }
}

impl Drop for SocketWrapper {
    fn drop(&mut self) {
        self.stop();
        if let Ok(socket) = self.socket.lock() {
            if let Err(e) = socket.set_linger(0) {
                log::debug!("set_linger failed during drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> zmq::Context {
        zmq::Context::new()
    }

    #[test]
    fn bind_to_wildcard_tcp_makes_socket_valid_and_records_endpoints() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::PUB).unwrap();
        let info = wrapper.bind("tcp://127.0.0.1:*").unwrap();
        assert!(wrapper.valid());
        assert!(info.port > 0);
        assert!(!wrapper.endpoints().is_empty());
    }

    #[test]
    fn bind_to_wildcard_host_records_one_endpoint_per_local_ip() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::PUB).unwrap();
        wrapper.bind("tcp://0.0.0.0:*").unwrap();
        let expected = dq_util::net::own_ips(true).unwrap().len();
        assert_eq!(wrapper.endpoints().len(), expected);
    }

    #[test]
    fn disconnect_all_clears_endpoints_and_invalidates() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::PUB).unwrap();
        wrapper.bind("tcp://127.0.0.1:*").unwrap();
        wrapper.disconnect_all();
        assert!(!wrapper.valid());
        assert!(wrapper.endpoints().is_empty());
    }

    #[test]
    fn wait_valid_returns_true_once_bound() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::PUB).unwrap();
        assert!(!wrapper.wait_valid(Some(10)));
        wrapper.bind("tcp://127.0.0.1:*").unwrap();
        assert!(wrapper.wait_valid(Some(1000)));
    }

    #[test]
    fn stop_wakes_a_waiter_parked_in_wait_valid_with_false() {
        let c = ctx();
        let wrapper = std::sync::Arc::new(SocketWrapper::new(&c, zmq::SocketType::PUB).unwrap());
        let w = wrapper.clone();
        let handle = std::thread::spawn(move || w.wait_valid(None));
        std::thread::sleep(Duration::from_millis(50));
        wrapper.stop();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn poll_in_on_invalid_socket_is_false() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::SUB).unwrap();
        assert_eq!(wrapper.poll_in(0).unwrap(), false);
    }

    #[test]
    fn valid_subscription_truncates_and_sanitizes() {
        let c = ctx();
        let wrapper = SocketWrapper::new(&c, zmq::SocketType::SUB).unwrap();
        let out = wrapper.valid_subscription(&[1, b'a', 2]);
        assert_eq!(out, vec![b' ', b'a', b' ']);
    }
}
