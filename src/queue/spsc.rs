//! `Ring1Core` — the single-producer/single-consumer ring, and
//! `SpscQueue`, its public facade.
//!
//! Grounded on `examples/original_source/include/iqueue.h`'s `iqueue1_t`
//! (plain `readpos`/`writepos` indices advanced modulo capacity, one
//! writer owns `writepos`, one reader owns `readpos`) rather than the
//! monotonic-sequence-plus-mask style of `kaos`'s disruptor rings, since
//! a single producer and consumer need nothing fancier than two plain
//! indices. The blocking wrapper and close protocol are still the same
//! `WaitGate` shape used by `queue::mpmc`.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::gate::WaitGate;
use crate::handle::{Handle, HandleCell};
use crate::insights;
use crate::metrics::{Metrics, MetricsSnapshot};

use super::close_protocol;

/// The ring mechanics themselves. `readpos`/`writepos` are plain
/// `Cell<u32>` rather than atomics: exactly one thread ever writes
/// `writepos` and exactly one ever writes `readpos`, so no atomic RMW is
/// needed on either — only the handle cells they guard need cross-thread
/// visibility, which the `HandleCell`'s own atomic already provides.
struct Ring1Core {
    cells: Box<[HandleCell]>,
    capacity: usize,
    writepos: Cell<u32>,
    readpos: Cell<u32>,
    closed: AtomicBool,
}

/// Safety: `writepos` is only ever read or written by the single thread
/// holding the producer side of the facade, and `readpos` only by the
/// single thread holding the consumer side; `send`/`recv` on `SpscQueue`
/// never move those roles between threads within one call. Cross-thread
/// visibility of the handle cells themselves is established by the
/// `AcqRel` handle-cell CAS, not by these two cells.
unsafe impl Sync for Ring1Core {}

impl Ring1Core {
    fn new(requested_capacity: usize) -> Result<Self> {
        let capacity = QueueConfig::new(requested_capacity)?.requested_capacity;
        let cells = crate::handle::try_allocate_cells(capacity)?;
        Ok(Self {
            cells,
            capacity,
            writepos: Cell::new(0),
            readpos: Cell::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Attempt to publish into the cell at `writepos` and only advance
    /// `writepos` once that CAS succeeds, so a full ring (the consumer
    /// hasn't freed the slot this position wraps onto yet) leaves the
    /// position untouched rather than needing a rollback. Fullness is
    /// decided entirely by the cell CAS, so the ring can hold a number of
    /// handles equal to its full capacity rather than capacity minus one.
    fn try_enqueue(&self, handle: Handle) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let pos = self.writepos.get();
        if !self.cells[pos as usize].try_publish(handle) {
            return Err(QueueError::WouldBlock);
        }
        self.writepos.set((pos + 1) % self.capacity as u32);
        Ok(())
    }

    fn try_dequeue(&self) -> Result<Handle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let pos = self.readpos.get();
        match self.cells[pos as usize].try_claim() {
            Some(handle) => {
                self.readpos.set((pos + 1) % self.capacity as u32);
                Ok(handle)
            }
            None => Err(QueueError::WouldBlock),
        }
    }

    fn is_empty(&self) -> bool {
        self.cells[self.readpos.get() as usize].is_empty()
    }

    /// A plain `writepos - readpos` is ambiguous between "empty" and
    /// "full" once both positions coincide after wraparound, so the
    /// coincident case is disambiguated directly against the next cell's
    /// occupancy instead.
    fn size(&self) -> usize {
        let w = self.writepos.get();
        let r = self.readpos.get();
        if w == r {
            if self.is_empty() {
                0
            } else {
                self.capacity
            }
        } else if w > r {
            (w - r) as usize
        } else {
            self.capacity - (r - w) as usize
        }
    }
}

/// A bounded, lock-free, single-producer single-consumer handle queue.
///
/// Unlike `MpmcQueue`, ordering is total: handles are delivered in
/// exactly the order they were sent. Calling `send`/`try_send` from more
/// than one thread at a time, or `recv`/`try_recv` from more than one
/// thread at a time, is a logic error the type does not itself detect.
pub struct SpscQueue {
    core: Ring1Core,
    reader: WaitGate,
    writer: WaitGate,
    metrics: Metrics,
}

impl SpscQueue {
    pub fn new(capacity: usize) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            core: Ring1Core::new(capacity)?,
            reader: WaitGate::new(),
            writer: WaitGate::new(),
            metrics: Metrics::new(),
        }))
    }

    /// Construct with [`crate::constants::DEFAULT_SPSC_CAPACITY`], for
    /// callers with no specific sizing requirement in mind.
    pub fn with_default_capacity() -> Result<Arc<Self>> {
        Self::new(crate::constants::DEFAULT_SPSC_CAPACITY)
    }

    pub fn try_send(&self, handle: Handle) -> Result<()> {
        let result = self.core.try_enqueue(handle);
        match result {
            Ok(()) => {
                self.metrics.record_send();
                insights::record_send(handle.get());
                self.reader.wake_one();
            }
            Err(QueueError::WouldBlock) => self.metrics.record_would_block(),
            Err(QueueError::Closed) => self.metrics.record_closed_rejection(),
            Err(_) => {}
        }
        result
    }

    pub fn send(&self, handle: Handle) -> Result<()> {
        self.writer.blocking(
            || self.try_send(handle),
            || {
                self.metrics.record_parked();
                insights::record_park("writer");
            },
        )
    }

    pub fn try_recv(&self) -> Result<Handle> {
        let result = self.core.try_dequeue();
        match result {
            Ok(handle) => {
                self.metrics.record_receive();
                insights::record_receive(handle.get());
                self.writer.wake_one();
            }
            Err(QueueError::WouldBlock) => self.metrics.record_would_block(),
            Err(QueueError::Closed) => self.metrics.record_closed_rejection(),
            Err(_) => {}
        }
        result
    }

    pub fn recv(&self) -> Result<Handle> {
        self.reader.blocking(
            || self.try_recv(),
            || {
                self.metrics.record_parked();
                insights::record_park("reader");
            },
        )
    }

    pub fn close(&self) {
        insights::record_close();
        close_protocol(&self.core.closed, &self.reader, &self.writer);
    }

    pub fn capacity(&self) -> usize {
        self.core.capacity
    }

    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for SpscQueue {
    fn drop(&mut self) {
        self.close();
    }
}
