//! Lightweight, always-on counters for both queue flavors.
//!
//! Grounded on `kaos::metrics::Metrics`: a struct of relaxed `AtomicU64`
//! fields plus a `snapshot()` that copies them into a plain `Copy` struct
//! for the caller to print or export. Field names are renamed from the
//! byte-oriented originals (`bytes_sent`, `retransmits`) to the
//! operations this handle queue actually exposes.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    sent: AtomicU64,
    received: AtomicU64,
    would_block: AtomicU64,
    parked: AtomicU64,
    closed_rejections: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            would_block: AtomicU64::new(0),
            parked: AtomicU64::new(0),
            closed_rejections: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_send(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_receive(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_would_block(&self) {
        self.would_block.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_parked(&self) {
        self.parked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_closed_rejection(&self) {
        self.closed_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            would_block: self.would_block.load(Ordering::Relaxed),
            parked: self.parked.load(Ordering::Relaxed),
            closed_rejections: self.closed_rejections.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sent: u64,
    pub received: u64,
    pub would_block: u64,
    pub parked: u64,
    pub closed_rejections: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sent={} received={} would_block={} parked={} closed_rejections={}",
            self.sent, self.received, self.would_block, self.parked, self.closed_rejections
        )
    }
}
