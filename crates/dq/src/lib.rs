//! Flat re-export of the concurrency, codec, table collector and transport
//! building blocks: `Barrier`, `AsyncWorker`, `ActiveQueue`, `TimerService`
//! from `dq-sync`; `Kind`, `ValueReader`, `ValueWriter` from `dq-codec`;
//! `TableCollector` from `dq-table`; UTF-8/hex/net/file-hash/subscription
//! helpers from `dq-util`; `SocketWrapper` and endpoint parsing from
//! `dq-transport`.

// Re-export error handling, constants and the shared clock.
pub use dq_core::{constants, DqError, DqResult, RelativeTime};

// Re-export concurrency primitives.
pub use dq_sync::{
    ActiveQueue, ActiveQueueConfig, AsyncWorker, AsyncWorkerConfig, Barrier, TimerService,
    TimerServiceConfig,
};

// Re-export the value-buffer codec.
pub use dq_codec::{Kind, Mempool, NullBitmap, ValueReader, ValueWriter};

// Re-export the block x column table collector.
pub use dq_table::{Row, TableCollector};

// Re-export small standalone utilities.
pub use dq_util::{filehash, hex, net, subscription, utf8};

// Re-export ZeroMQ transport plumbing.
pub use dq_transport::{bracket_if_ipv6, parse_tcp_endpoint, EndpointInfo, SocketWrapper};
