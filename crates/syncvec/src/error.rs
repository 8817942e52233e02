//! # Sequence Error Types
//!
//! All errors that can occur when operating on a synchronized sequence.

use thiserror::Error;

/// Errors that can occur when operating on a synchronized sequence.
///
/// Queries never produce these: an out-of-range read returns `None`.
/// Mutations report them through their completion callback, because index
/// validity can only be judged at the moment the mutation actually runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// A mutation targeted an index that was out of range when it ran.
    ///
    /// The index may have been valid at submission time; a concurrent
    /// structural mutation admitted first can invalidate it.
    #[error("index out of bounds: index {index}, length {len}")]
    IndexOutOfBounds {
        /// The index the mutation targeted.
        index: usize,
        /// The sequence length at the moment the mutation ran.
        len: usize,
    },
}

/// Result type for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;
