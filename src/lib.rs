//! A zero-copy, bounded, inter-thread handle queue.
//!
//! `parcel` moves an opaque, caller-chosen, non-null `usize` — a
//! [`Handle`] — between threads without ever looking at what it points
//! to. Two ring flavors share one operation surface:
//!
//! - [`MpmcQueue`]: any number of producers, any number of consumers,
//!   contention-sharded capacity accounting so producers rarely fight
//!   over the same cache line.
//! - [`SpscQueue`]: exactly one producer, exactly one consumer, strict
//!   FIFO delivery, no sharding needed since there's nothing to shard
//!   across.
//!
//! Both flavors expose non-blocking `try_send`/`try_recv` (returning
//! [`QueueError::WouldBlock`] rather than parking) and blocking
//! `send`/`recv` built on top of them. [`Signal`] is a separate,
//! queue-independent completion counter for out-of-band "I'm done"
//! handshakes between threads.
//!
//! Enable the `tracing` feature for `tracing::trace_span!` instrumentation
//! on every send/recv/close; it is entirely compiled out otherwise.

mod config;
mod constants;
mod error;
mod gate;
mod handle;
mod insights;
mod metrics;
mod queue;
mod signal;

pub use config::QueueConfig;
pub use constants::{DEFAULT_SPSC_CAPACITY, MAX_MPMC_CAPACITY, MPMC_SHARDS};
pub use error::{QueueError, Result};
pub use handle::Handle;
pub use metrics::MetricsSnapshot;
pub use queue::{MpmcQueue, SpscQueue};
pub use signal::Signal;
