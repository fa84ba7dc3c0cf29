//! The opaque handle type and the atomic cell used to hand one off
//! between threads.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{QueueError, Result};

const EMPTY: usize = 0;

/// Allocate a boxed slice of `count` empty cells, surfacing a genuine
/// allocator failure as `QueueError::OutOfMemory` instead of aborting the
/// process. `try_reserve_exact` is the one point in construction where
/// the allocator can actually fail, so it's the only place this error is
/// ever produced.
pub(crate) fn try_allocate_cells(count: usize) -> Result<Box<[HandleCell]>> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(count)
        .map_err(|_| QueueError::OutOfMemory(count))?;
    cells.resize_with(count, HandleCell::new);
    Ok(cells.into_boxed_slice())
}

/// An opaque, pointer-sized, non-null value chosen by the caller.
///
/// `parcel` never dereferences a `Handle` — it is borrowed through the
/// queue, not owned by it. The all-zeros bit pattern is reserved to mean
/// "cell is empty"; `Handle::new` rejects it with `InvalidArgument` so a
/// zero can never reach a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    pub fn new(value: usize) -> Result<Self> {
        NonZeroUsize::new(value)
            .map(Handle)
            .ok_or(QueueError::InvalidArgument("handle must be non-zero"))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One slot in a ring's array: either empty or holding a `Handle`.
///
/// Producers publish a handle into a cell via an atomic CAS from empty to
/// handle; consumers claim a handle via a CAS from handle to empty. These
/// two CASes are the sole mechanism of handoff between threads.
pub(crate) struct HandleCell(AtomicUsize);

impl HandleCell {
    pub fn new() -> Self {
        Self(AtomicUsize::new(EMPTY))
    }

    /// Spin until the cell transitions empty -> handle. Used by the MPMC
    /// ring, where the cell's previous consumer may not have zeroed it yet
    /// even though capacity accounting says the slot is reserved.
    pub fn publish_spin(&self, handle: Handle) {
        let value = handle.get();
        loop {
            if self
                .0
                .compare_exchange_weak(EMPTY, value, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            std::hint::spin_loop();
        }
    }

    /// Spin until the cell holds a handle, then claim it (handle -> empty).
    pub fn claim_spin(&self) -> Handle {
        loop {
            let current = self.0.load(Ordering::Acquire);
            if current != EMPTY
                && self
                    .0
                    .compare_exchange_weak(current, EMPTY, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            {
                return Handle(NonZeroUsize::new(current).expect("cell held a non-empty handle"));
            }
            std::hint::spin_loop();
        }
    }

    /// Single-attempt publish. Used by the SPSC ring, where a full cell is
    /// a genuine backpressure signal rather than a transient handoff race.
    pub fn try_publish(&self, handle: Handle) -> bool {
        self.0
            .compare_exchange(EMPTY, handle.get(), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Single-attempt claim.
    pub fn try_claim(&self) -> Option<Handle> {
        let current = self.0.load(Ordering::Acquire);
        if current == EMPTY {
            return None;
        }
        self.0
            .compare_exchange(current, EMPTY, Ordering::AcqRel, Ordering::Relaxed)
            .ok()
            .map(|v| Handle(NonZeroUsize::new(v).expect("cell held a non-empty handle")))
    }

    /// Non-destructive peek, used by the SPSC `size()` disambiguation.
    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Acquire) == EMPTY
    }
}
