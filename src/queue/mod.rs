//! The public queue facades, layered over the two ring cores.

pub mod mpmc;
pub mod spsc;

pub use mpmc::MpmcQueue;
pub use spsc::SpscQueue;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::gate::WaitGate;

/// The orderly close protocol shared by both queue flavors: take both
/// gate locks in a fixed order, flip the closed flag once under both,
/// then release and broadcast-and-drain until no waiter remains on
/// either gate. This is a quiescence barrier, not a strict memory
/// barrier — it guarantees every waiter has observed the closed flag
/// and returned from its wait, not that every in-flight `try_*` call
/// has completed.
pub(crate) fn close_protocol(closed: &AtomicBool, reader: &WaitGate, writer: &WaitGate) {
    {
        let _r = reader.lock();
        let _w = writer.lock();
        closed.store(true, Ordering::SeqCst);
    }
    loop {
        reader.broadcast();
        writer.broadcast();
        if reader.waitcount() == 0 && writer.waitcount() == 0 {
            break;
        }
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_protocol_returns_immediately_with_no_waiters() {
        let closed = AtomicBool::new(false);
        let reader = WaitGate::new();
        let writer = WaitGate::new();
        close_protocol(&closed, &reader, &writer);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn close_protocol_is_idempotent() {
        let closed = AtomicBool::new(false);
        let reader = WaitGate::new();
        let writer = WaitGate::new();
        close_protocol(&closed, &reader, &writer);
        close_protocol(&closed, &reader, &writer);
        assert!(closed.load(Ordering::SeqCst));
    }
}
