use crate::buffer::BufferId;
use crate::region::Point;
use thiserror::Error;

/// Errors produced by buffer mutation and position remapping.
///
/// Every error is local: the operation that returned it made no change, and the caller may retry
/// with a fresh session or stamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid edit state for buffer {buffer:?}: {reason}")]
    /// A mutation was presented with a foreign, closed or missing edit token.
    InvalidEditState {
        /// The buffer the mutation was attempted on.
        buffer: BufferId,
        /// Why the token was rejected.
        reason: &'static str,
    },

    #[error("an edit session is already open on buffer {0:?}")]
    /// A second session was requested while one is open.
    SessionAlreadyOpen(BufferId),

    #[error("version stamp {stamp_version} cannot be resolved against buffer {buffer:?} at version {current_version}")]
    /// A version stamp from another buffer or from a version the buffer never reached.
    InvalidVersionStamp {
        /// The buffer the remap was attempted on.
        buffer: BufferId,
        /// Version recorded in the stamp.
        stamp_version: u64,
        /// Version the remap targeted.
        current_version: u64,
    },

    #[error("point {point} is outside the buffer (length {len})")]
    /// A point past the end of the buffer was passed to a mutation.
    OutOfRange {
        /// The offending point.
        point: Point,
        /// Buffer length in characters.
        len: usize,
    },
}
