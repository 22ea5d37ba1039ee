//! ZeroMQ transport plumbing: a validity-gated socket wrapper with
//! wildcard-host bind expansion, retrying sends, and TCP endpoint parsing.

pub mod endpoint;
pub mod socket;

pub use endpoint::{bracket_if_ipv6, parse_tcp_endpoint, EndpointInfo};
pub use socket::SocketWrapper;
