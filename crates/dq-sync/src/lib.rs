//! Thread-based concurrency primitives: an arrival barrier, a supervised
//! background worker, a pooled active queue, and a priority-driven timer
//! service built on top of it.

pub mod barrier;
pub mod config;
pub mod queue;
pub mod timer;
pub mod worker;

pub use barrier::Barrier;
pub use config::{ActiveQueueConfig, AsyncWorkerConfig, TimerServiceConfig};
pub use queue::ActiveQueue;
pub use timer::TimerService;
pub use worker::AsyncWorker;
