//! # SYNCVEC
//!
//! A thread-safe ordered sequence designed for:
//! - Unlimited concurrent readers, zero reader-to-reader blocking
//! - Fire-and-forget mutations, serialized by a single writer
//! - Completion delivery on one fixed notification context
//!
//! ## Architecture Rules
//!
//! 1. **Reads are inline and consistent** - a query runs on the calling
//!    thread under a shared lock and returns a snapshot copy, never an alias
//!    into the backing storage
//! 2. **Mutations never block the submitter** - they queue onto a per-
//!    container writer thread and apply atomically, in FIFO order per
//!    submitting thread
//! 3. **Completions are single-homed** - every completion callback runs on
//!    one dedicated notification thread, so consumers can update their own
//!    state without locking
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncvec::SynchronizedSequence;
//!
//! let seq = SynchronizedSequence::from_vec(vec![1, 2, 3]);
//! seq.append(4);                                  // returns immediately
//! seq.remove_at_then(0, |removed| { /* notify thread */ });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod notify;
pub mod sequence;

pub use error::{SequenceError, SequenceResult};
pub use notify::{NotifyContext, NotifyHandle};
pub use sequence::SynchronizedSequence;
