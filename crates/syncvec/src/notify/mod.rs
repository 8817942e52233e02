//! # Notification Context
//!
//! The single fixed execution context on which mutation-completion callbacks
//! are delivered.
//!
//! ## The Problem
//!
//! ```text
//! Thread 1: remove_at_then(3, update_view)   ─┐
//! Thread 2: remove_at_then(9, update_view)   ─┼─> which thread runs
//! Writer:   applies mutations, one at a time ─┘   update_view?
//! ```
//!
//! A consumer that reacts to completions (a presentation layer, a cache, a
//! metrics sink) needs its own state touched from exactly one place. If
//! completions ran on the submitting thread or on the writer thread, the
//! consumer would need its own locking all over again.
//!
//! ## The Solution
//!
//! One dedicated thread per [`NotifyContext`] drains a FIFO channel of boxed
//! callbacks. Every completion posted through a [`NotifyHandle`] runs on that
//! one thread, in post order, exactly once. Handles are cheap to clone, so
//! any number of containers can share a single delivery context.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// A callback queued for delivery on the notification thread.
type NotifyJob = Box<dyn FnOnce() + Send + 'static>;

enum NotifyMessage {
    Run(NotifyJob),
    Shutdown,
}

/// A fixed, single-threaded delivery context for completion callbacks.
///
/// Owns the delivery thread. Dropping the context delivers every callback
/// posted before the drop, then stops the thread; handles that outlive the
/// context become inert (posts through them are discarded).
///
/// ## Usage
///
/// ```rust,ignore
/// let notify = NotifyContext::new();
/// let seq = SynchronizedSequence::with_notify(notify.handle());
///
/// seq.remove_at_then(0, |removed| {
///     // runs on the notify thread, never on the caller's thread
/// });
/// ```
pub struct NotifyContext {
    tx: Sender<NotifyMessage>,
    thread: Option<JoinHandle<()>>,
}

impl NotifyContext {
    /// Creates a new context and starts its delivery thread.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();

        let thread = thread::Builder::new()
            .name("syncvec-notify".into())
            .spawn(move || Self::delivery_loop(&rx))
            .unwrap_or_else(|e| panic!("failed to spawn notify thread: {e}"));

        Self {
            tx,
            thread: Some(thread),
        }
    }

    /// Returns a cloneable handle for posting callbacks to this context.
    #[must_use]
    pub fn handle(&self) -> NotifyHandle {
        NotifyHandle {
            tx: self.tx.clone(),
        }
    }

    /// Delivery thread main loop. Runs callbacks strictly in post order.
    fn delivery_loop(rx: &Receiver<NotifyMessage>) {
        tracing::debug!("notify thread started");
        while let Ok(message) = rx.recv() {
            match message {
                NotifyMessage::Run(job) => job(),
                NotifyMessage::Shutdown => break,
            }
        }
        tracing::debug!("notify thread stopped");
    }
}

impl Default for NotifyContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NotifyContext {
    fn drop(&mut self) {
        // Sentinel queues behind every callback already posted, so they all
        // deliver before the thread exits.
        let _ = self.tx.send(NotifyMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Handle for posting callbacks onto a [`NotifyContext`].
///
/// Cloneable and `Send`; many containers and threads can post through
/// handles to the same context concurrently.
#[derive(Clone)]
pub struct NotifyHandle {
    tx: Sender<NotifyMessage>,
}

impl NotifyHandle {
    /// Posts a callback for delivery on the context's thread.
    ///
    /// If the context has been dropped, the callback is discarded.
    pub fn post<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(NotifyMessage::Run(Box::new(callback))).is_err() {
            tracing::debug!("notify context gone, completion discarded");
        }
    }
}

impl std::fmt::Debug for NotifyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHandle")
            .field("pending", &self.tx.len())
            .finish()
    }
}
