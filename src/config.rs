//! Shared capacity validation for queue construction.

use crate::error::{QueueError, Result};

/// Validated construction parameters for a queue.
///
/// Both `MpmcQueue::new` and `SpscQueue::new` take a plain `capacity: usize`,
/// but build one of these internally so the "capacity must be positive"
/// rule lives in one place and is independently testable. Flavor-specific
/// rounding (the MPMC ring's power-of-two-at-least-`MPMC_SHARDS` rule)
/// happens on top of this in `queue::mpmc::round_mpmc_capacity`.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub requested_capacity: usize,
}

impl QueueConfig {
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(QueueError::InvalidArgument("capacity must be greater than 0"));
        }
        Ok(Self { requested_capacity })
    }
}
