//! `RingCore` — the lock-free MPMC ring, and `MpmcQueue`, the public
//! facade over it.
//!
//! Grounded on the cursor/CAS claim style of
//! `kaos::disruptor::mpmc::mpmc_ring_buffer::MpmcRingBuffer::try_claim`
//! and the claim-then-complete split in
//! `kaos::disruptor::completion_tracker::CompletionTracker`, reworked
//! around sharded free/used counters instead of a single completion
//! tracker, since distinct producers here have no ordering guarantee to
//! preserve across each other.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::constants::{HEAD_SIZE_BITS, MAX_MPMC_CAPACITY, MPMC_SHARDS};
use crate::error::{QueueError, Result};
use crate::gate::WaitGate;
use crate::handle::{Handle, HandleCell};
use crate::insights;
use crate::metrics::{Metrics, MetricsSnapshot};

use super::close_protocol;

/// Round a requested capacity up to the next power of two no smaller than
/// `MPMC_SHARDS`, so `capacity / MPMC_SHARDS` is always an integer and
/// `pos & (capacity - 1)` is always a valid modulo.
fn round_mpmc_capacity(requested: usize) -> Result<usize> {
    let config = QueueConfig::new(requested)?;
    let capacity = config.requested_capacity.max(MPMC_SHARDS).next_power_of_two();
    if capacity > MAX_MPMC_CAPACITY {
        return Err(QueueError::InvalidArgument(
            "capacity exceeds the maximum representable by the packed head/size word",
        ));
    }
    Ok(capacity)
}

const HEAD_SIZE_MASK: u32 = (1 << HEAD_SIZE_BITS) - 1;

fn pack_head_size(next: u32, size: u32) -> u32 {
    (next << HEAD_SIZE_BITS) | (size & HEAD_SIZE_MASK)
}

fn unpack_head_size(word: u32) -> (u32, u32) {
    (word >> HEAD_SIZE_BITS, word & HEAD_SIZE_MASK)
}

pub(crate) struct RingCore {
    cells: Box<[HandleCell]>,
    capacity: usize,
    mask: u32,
    /// Best-effort diagnostic mirror of `(next, size)` — not the source
    /// of truth for backpressure, which lives in the sharded `free`/`used`
    /// counters below; this word may transiently lag or race under
    /// contention and is only ever updated with a single best-effort CAS.
    head_size: AtomicU32,
    writepos: AtomicU32,
    readpos: AtomicU32,
    ifree: AtomicU32,
    iused: AtomicU32,
    free: Box<[AtomicU32]>,
    used: Box<[AtomicU32]>,
    closed: AtomicBool,
}

impl RingCore {
    fn new(requested_capacity: usize) -> Result<Self> {
        let capacity = round_mpmc_capacity(requested_capacity)?;
        let shard_quota = (capacity / MPMC_SHARDS) as u32;

        let cells = crate::handle::try_allocate_cells(capacity)?;
        let free = (0..MPMC_SHARDS).map(|_| AtomicU32::new(shard_quota)).collect::<Vec<_>>().into_boxed_slice();
        let used = (0..MPMC_SHARDS).map(|_| AtomicU32::new(0)).collect::<Vec<_>>().into_boxed_slice();

        Ok(Self {
            cells,
            capacity,
            mask: (capacity - 1) as u32,
            head_size: AtomicU32::new(0),
            writepos: AtomicU32::new(0),
            readpos: AtomicU32::new(0),
            ifree: AtomicU32::new(0),
            iused: AtomicU32::new(0),
            free,
            used,
            closed: AtomicBool::new(false),
        })
    }

    /// Rotate across shards reserving one unit from `counters[i]`:
    /// fetch-sub, and if the post-subtraction value (read as unsigned) is
    /// below capacity a unit was genuinely reserved; otherwise the shard
    /// was exhausted, so the unit is credited back and the cursor rotates
    /// to the next shard. Up to `MPMC_SHARDS` attempts before giving up
    /// with `WouldBlock`.
    fn reserve(&self, counters: &[AtomicU32], cursor: &AtomicU32) -> Result<usize> {
        for _ in 0..MPMC_SHARDS {
            if self.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }
            let i = cursor.load(Ordering::Relaxed) as usize;
            let prev = counters[i].fetch_sub(1, Ordering::AcqRel);
            let reserved_value = prev.wrapping_sub(1);
            if reserved_value < self.capacity as u32 {
                return Ok(i);
            }
            counters[i].fetch_add(1, Ordering::AcqRel);
            let next = (i as u32 + 1) % MPMC_SHARDS as u32;
            let _ = cursor.compare_exchange(i as u32, next, Ordering::Relaxed, Ordering::Relaxed);
        }
        Err(QueueError::WouldBlock)
    }

    /// Single best-effort CAS attempt updating the packed diagnostic
    /// word; benign on failure, since `size()` is documented as
    /// approximate.
    fn mirror_head_size(&self, size_delta: i32, next_index: Option<u32>) {
        let current = self.head_size.load(Ordering::Relaxed);
        let (next, size) = unpack_head_size(current);
        let new_size = if size_delta >= 0 {
            size.wrapping_add(size_delta as u32)
        } else {
            size.wrapping_sub((-size_delta) as u32)
        };
        let updated = pack_head_size(next_index.unwrap_or(next), new_size);
        let _ = self.head_size.compare_exchange(current, updated, Ordering::Relaxed, Ordering::Relaxed);
    }

    fn try_enqueue(&self, handle: Handle) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let shard = self.reserve(&self.free, &self.ifree)?;
        let pos = self.writepos.fetch_add(1, Ordering::AcqRel) & self.mask;
        self.cells[pos as usize].publish_spin(handle);
        self.used[shard].fetch_add(1, Ordering::AcqRel);
        self.mirror_head_size(1, None);
        Ok(())
    }

    fn try_dequeue(&self) -> Result<Handle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let shard = self.reserve(&self.used, &self.iused)?;
        let pos = self.readpos.fetch_add(1, Ordering::AcqRel) & self.mask;
        let handle = self.cells[pos as usize].claim_spin();
        self.free[shard].fetch_add(1, Ordering::AcqRel);
        self.mirror_head_size(-1, Some(pos));
        Ok(handle)
    }

    /// Approximate element count: the gap between the two monotonic
    /// position counters. Both only ever advance past a cell after its
    /// capacity unit has been reserved, so `readpos <= writepos` always,
    /// keeping this within `[0, capacity]` save for the usual benign
    /// transient overshoot under heavy contention.
    fn size(&self) -> usize {
        let w = self.writepos.load(Ordering::Acquire);
        let r = self.readpos.load(Ordering::Acquire);
        (w.wrapping_sub(r) as usize).min(self.capacity)
    }

    /// Checks that every shard's `used + free` still equals its quota,
    /// which only holds when no operation is in flight.
    #[cfg(test)]
    fn shard_conservation_holds(&self) -> bool {
        let quota = (self.capacity / MPMC_SHARDS) as u32;
        (0..MPMC_SHARDS).all(|i| {
            let used = self.used[i].load(Ordering::Acquire);
            let free = self.free[i].load(Ordering::Acquire);
            used.wrapping_add(free) == quota
        })
    }
}

/// A bounded, lock-free, multi-producer multi-consumer handle queue.
///
/// No ordering guarantee holds across distinct producers: two producers'
/// handles may be consumed in an order different from their `send`
/// return order. Each producer's own successful sends are still
/// delivered to some consumer(s) in program order.
pub struct MpmcQueue {
    core: RingCore,
    reader: WaitGate,
    writer: WaitGate,
    metrics: Metrics,
}

impl MpmcQueue {
    pub fn new(capacity: usize) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            core: RingCore::new(capacity)?,
            reader: WaitGate::new(),
            writer: WaitGate::new(),
            metrics: Metrics::new(),
        }))
    }

    /// Non-blocking enqueue attempt.
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

    /// Blocking enqueue: attempts `try_send` and parks on the writer gate
    /// across `WouldBlock` outcomes, tolerating spurious wakeups.
    pub fn send(&self, handle: Handle) -> Result<()> {
        self.writer.blocking(
            || self.try_send(handle),
            || {
                self.metrics.record_parked();
                insights::record_park("writer");
            },
        )
    }

    /// Non-blocking dequeue attempt.
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

    /// Blocking dequeue: mirrors `send`, parking on the reader gate.
    pub fn recv(&self) -> Result<Handle> {
        self.reader.blocking(
            || self.try_recv(),
            || {
                self.metrics.record_parked();
                insights::record_park("reader");
            },
        )
    }

    /// Idempotent. Transitions the queue to a terminal refusing state and
    /// unblocks every parked `send`/`recv` with `Closed`.
    pub fn close(&self) {
        insights::record_close();
        close_protocol(&self.core.closed, &self.reader, &self.writer);
    }

    pub fn capacity(&self) -> usize {
        self.core.capacity
    }

    /// Best-effort current element count; may lag under concurrent
    /// contention since it is not the source of backpressure truth.
    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for MpmcQueue {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    #[test]
    fn rounds_capacity_up_to_a_power_of_two_at_least_shard_count() {
        assert_eq!(round_mpmc_capacity(1).unwrap(), MPMC_SHARDS);
        assert_eq!(round_mpmc_capacity(MPMC_SHARDS + 1).unwrap(), MPMC_SHARDS * 2);
        assert_eq!(round_mpmc_capacity(1024).unwrap(), 1024);
    }

    #[test]
    fn rejects_capacity_above_the_packed_word_ceiling() {
        assert!(matches!(
            round_mpmc_capacity(MAX_MPMC_CAPACITY * 2),
            Err(QueueError::InvalidArgument(_))
        ));
    }

    #[test]
    fn send_then_recv_round_trips() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        let h = Handle::new(99).unwrap();
        q.try_send(h).unwrap();
        assert_eq!(q.try_recv().unwrap(), h);
    }

    #[test]
    fn try_recv_on_empty_queue_would_block() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        assert_eq!(q.try_recv(), Err(QueueError::WouldBlock));
    }

    #[test]
    fn try_send_on_full_queue_would_block() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        for i in 1..=q.capacity() {
            q.try_send(Handle::new(i).unwrap()).unwrap();
        }
        assert_eq!(q.try_send(Handle::new(1).unwrap()), Err(QueueError::WouldBlock));
        assert_eq!(q.size(), q.capacity());
    }

    #[test]
    fn operations_on_a_closed_queue_return_closed() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        q.close();
        assert_eq!(q.try_send(Handle::new(1).unwrap()), Err(QueueError::Closed));
        assert_eq!(q.try_recv(), Err(QueueError::Closed));
        assert_eq!(q.recv(), Err(QueueError::Closed));
    }

    #[test]
    fn close_is_idempotent() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        q.close();
        q.close();
        assert_eq!(q.try_send(Handle::new(1).unwrap()), Err(QueueError::Closed));
    }

    #[test]
    fn close_unblocks_parked_producers_and_consumers() {
        let q = MpmcQueue::new(MPMC_SHARDS).unwrap();
        // Fill the queue so further sends must park.
        for i in 1..=q.capacity() {
            q.try_send(Handle::new(i).unwrap()).unwrap();
        }

        let mut joins = Vec::new();
        for _ in 0..8 {
            let q = Arc::clone(&q);
            joins.push(thread::spawn(move || q.send(Handle::new(1).unwrap())));
        }
        for _ in 0..8 {
            // Drain nothing; these consumers race the closing queue once
            // it's already full, so they just find data until it closes.
        }

        thread::sleep(std::time::Duration::from_millis(10));
        q.close();

        for j in joins {
            assert_eq!(j.join().unwrap(), Err(QueueError::Closed));
        }
    }

    #[test]
    fn shard_conservation_holds_at_rest() {
        let q = MpmcQueue::new(MPMC_SHARDS * 2).unwrap();
        for i in 1..=10 {
            q.try_send(Handle::new(i).unwrap()).unwrap();
        }
        for _ in 0..5 {
            q.try_recv().unwrap();
        }
        assert!(q.core.shard_conservation_holds());
    }

    #[test]
    fn no_duplication_and_no_loss_under_contention() {
        let q = MpmcQueue::new(4096).unwrap();
        let num_producers = 5usize;
        let items_per_producer = 2000u64;
        let total_items = num_producers as u64 * items_per_producer;

        let mut producers = Vec::new();
        for p in 0..num_producers {
            let q = Arc::clone(&q);
            producers.push(thread::spawn(move || {
                let base = p as u64 * items_per_producer;
                for n in 0..items_per_producer {
                    let value = base + n + 1; // keep values non-zero
                    loop {
                        match q.send(Handle::new(value as usize).unwrap()) {
                            Ok(()) => break,
                            Err(QueueError::WouldBlock) => std::hint::spin_loop(),
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
            }));
        }

        let received_sum = Arc::new(AtomicU64::new(0));
        let received_count = Arc::new(AtomicU64::new(0));
        let mut consumers = Vec::new();
        for _ in 0..3 {
            let q = Arc::clone(&q);
            let sum = Arc::clone(&received_sum);
            let count = Arc::clone(&received_count);
            consumers.push(thread::spawn(move || loop {
                match q.recv() {
                    Ok(handle) => {
                        sum.fetch_add(handle.get() as u64, Ordering::Relaxed);
                        count.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(QueueError::Closed) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }));
        }

        for p in producers {
            p.join().unwrap();
        }
        // Let consumers drain what's left, then close to release them.
        while q.size() > 0 {
            std::hint::spin_loop();
        }
        q.close();
        for c in consumers {
            c.join().unwrap();
        }

        let expected_sum: u64 = (1..=total_items).sum();
        assert_eq!(received_count.load(Ordering::Relaxed), total_items);
        assert_eq!(received_sum.load(Ordering::Relaxed), expected_sum);
    }
}
