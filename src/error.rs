//! Error types for parcel.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

/// The error taxonomy of a bounded handle queue.
///
/// `WouldBlock` is advisory: the blocking `send`/`recv` forms treat it as
/// "go park" rather than surfacing it to the caller. `Closed` is terminal
/// and monotonic — once a queue returns it, every later operation on that
/// queue returns it too.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("allocation failed for capacity {0}")]
    OutOfMemory(usize),

    #[error("resource initialization failed: {0}")]
    ResourceInit(&'static str),

    #[error("operation would block")]
    WouldBlock,

    #[error("queue is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_a_message_for_every_variant() {
        let variants = [
            QueueError::InvalidArgument("x"),
            QueueError::OutOfMemory(4096),
            QueueError::ResourceInit("x"),
            QueueError::WouldBlock,
            QueueError::Closed,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
