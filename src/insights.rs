//! Observability hooks — zero-cost when the `tracing` feature is off.
//!
//! Grounded on `kaos::insights`: the same `#[cfg(feature = "tracing")]`
//! / `#[cfg(not(feature = "tracing"))]` pairing per event, dropping the
//! Tracy profiler wiring, which is out of scope for this crate's ambient
//! stack.

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_send(handle: usize) {
    let _span = tracing::trace_span!("parcel.send", handle).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_send(_handle: usize) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_receive(handle: usize) {
    let _span = tracing::trace_span!("parcel.recv", handle).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_receive(_handle: usize) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_park(role: &'static str) {
    let _span = tracing::trace_span!("parcel.park", role).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_park(_role: &'static str) {}

#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_close() {
    let _span = tracing::info_span!("parcel.close").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_close() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_hook_compiles_and_runs_with_or_without_tracing() {
        record_send(1);
        record_receive(1);
        record_park("reader");
        record_close();
    }
}
