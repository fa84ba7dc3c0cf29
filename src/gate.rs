//! `WaitGate` — the internal parking lot used on both producer and
//! consumer sides of a queue.
//!
//! Pairs a mutex, a condvar, and a waiter count, the same shape as
//! `Signal` minus the signal counter — its state is implied entirely by
//! the ring's atomic capacity accounting.

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::QueueError;

pub(crate) struct GateState {
    pub waitcount: usize,
}

pub(crate) struct WaitGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl WaitGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState { waitcount: 0 }),
            condvar: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock()
    }

    /// Wake one parked waiter, but only if one is actually parked, to
    /// avoid a thundering herd of spurious wakeups on every successful
    /// send/recv.
    pub fn wake_one(&self) {
        let state = self.state.lock();
        if state.waitcount > 0 {
            self.condvar.notify_one();
        }
    }

    pub fn broadcast(&self) {
        self.condvar.notify_all();
    }

    pub fn waitcount(&self) -> usize {
        self.state.lock().waitcount
    }

    /// The fast-path/slow-path wait protocol common to `send`/`recv`:
    /// attempt `try_once` once; if it would block, park on this gate and
    /// retry after every wakeup until it returns a definitive outcome
    /// (`Ok`, `Closed`, or anything other than `WouldBlock`). Tolerates
    /// spurious wakeups by construction — the loop only exits on that
    /// definitive outcome, never on the wakeup alone.
    ///
    /// `on_park` fires once, only on the transition into the slow path —
    /// callers use it to record parked-caller metrics/spans without this
    /// gate needing to know about either.
    pub fn blocking<T>(
        &self,
        mut try_once: impl FnMut() -> Result<T, QueueError>,
        on_park: impl FnOnce(),
    ) -> Result<T, QueueError> {
        match try_once() {
            Err(QueueError::WouldBlock) => {}
            other => return other,
        }
        on_park();

        let mut state = self.state.lock();
        state.waitcount += 1;
        let result = loop {
            match try_once() {
                Err(QueueError::WouldBlock) => self.condvar.wait(&mut state),
                other => break other,
            }
        };
        state.waitcount -= 1;
        result
    }
}
