//! # The Synchronized Sequence
//!
//! ## The Problem
//!
//! ```text
//! Thread 1 (producer):  APPEND to the list
//! Thread 2 (consumer):  READ the list
//!
//! Without synchronization: RACE CONDITION -> CRASH
//! With one big Mutex:      every reader blocks every reader
//! ```
//!
//! ## The Solution: shared reads, serialized writes
//!
//! ```text
//!   Reader 1 ──┐
//!   Reader 2 ──┼──> [RwLock::read]  ── snapshot copies, inline
//!   Reader N ──┘         │
//!                        │  never overlaps
//!                        ▼
//!   Writer 1 ──┐                          ┌──> [Notify Thread]
//!   Writer 2 ──┼──> [Job Channel] ──> [Writer Thread] ── completions
//!   Writer N ──┘     (fire-and-forget)  [RwLock::write]
//! ```
//!
//! Readers share the lock and never wait on each other. Mutations queue on
//! a FIFO channel and return immediately; one writer thread applies them
//! under the exclusive lock, one at a time, so no read ever observes a
//! half-applied mutation.

mod synchronized;
mod writer;

pub use synchronized::SynchronizedSequence;
