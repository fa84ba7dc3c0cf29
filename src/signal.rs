//! `Signal` — an externally observable completion counter.
//!
//! Senders and receivers use a `Signal` to coordinate on out-of-band
//! "message processed" events; it is independent of any particular queue.
//! The mutex/condvar pairing mirrors the one `parking_lot`-based blocking
//! primitive in the corpus this crate is grounded on
//! (`flux`'s `BlockingWaitStrategy`), generalized with `waitcount`/
//! `signalcount` bookkeeping so any number of waiters can park on the
//! same counter.
//!
//! `wait` deliberately does **not** clear `signalcount` on return —
//! clearing is a separate, explicit operation, so a signal posted before
//! a waiter parks is never silently lost.

use parking_lot::{Condvar, Mutex};

struct SignalState {
    waitcount: usize,
    signalcount: u64,
}

pub struct Signal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl Signal {
    /// `parking_lot` primitives don't fail to construct on any platform
    /// this crate targets, so construction here is infallible.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                waitcount: 0,
                signalcount: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Increment `signalcount` and wake every waiter. Never fails.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        state.signalcount += 1;
        self.condvar.notify_all();
    }

    /// Block until `signalcount` is nonzero. A single `cond_wait`, not a
    /// retry loop: a spurious wakeup can return before a signal has
    /// actually arrived, so a caller that still needs one is expected to
    /// call `wait` again.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        if state.signalcount == 0 {
            state.waitcount += 1;
            self.condvar.wait(&mut state);
            state.waitcount -= 1;
        }
    }

    /// Atomically read and zero `signalcount`, returning the prior value.
    pub fn clear(&self) -> u64 {
        let mut state = self.state.lock();
        std::mem::replace(&mut state.signalcount, 0)
    }

    /// Read `signalcount` without clearing it.
    pub fn count(&self) -> u64 {
        self.state.lock().signalcount
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
