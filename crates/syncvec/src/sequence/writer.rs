//! # Mutation Serialization Worker
//!
//! One writer thread per container drains a FIFO channel of mutation jobs
//! and applies them under the exclusive lock, one at a time. Submitters
//! never wait: a submitted job runs at some later point, after every job
//! submitted before it on the same channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

/// A queued mutation. Runs with exclusive access to the backing storage.
pub(crate) type MutationJob<T> = Box<dyn FnOnce(&mut Vec<T>) + Send + 'static>;

enum WriterMessage<T> {
    Apply(MutationJob<T>),
    Shutdown,
}

/// Owns the writer thread for one container.
///
/// Dropping the writer queues a shutdown sentinel behind every mutation
/// already submitted, so the queue fully drains before the thread exits.
pub(crate) struct Writer<T> {
    tx: Sender<WriterMessage<T>>,
    thread: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> Writer<T> {
    /// Starts the writer thread for the given backing storage.
    pub(crate) fn spawn(storage: Arc<RwLock<Vec<T>>>) -> Self {
        let (tx, rx) = unbounded();

        let thread = thread::Builder::new()
            .name("syncvec-writer".into())
            .spawn(move || Self::writer_loop(&storage, &rx))
            .unwrap_or_else(|e| panic!("failed to spawn writer thread: {e}"));

        Self {
            tx,
            thread: Some(thread),
        }
    }

    /// Writer thread main loop.
    ///
    /// The write lock is taken per job, not per batch: readers get a chance
    /// to interleave between any two mutations.
    fn writer_loop(storage: &Arc<RwLock<Vec<T>>>, rx: &Receiver<WriterMessage<T>>) {
        tracing::debug!("writer thread started");
        while let Ok(message) = rx.recv() {
            match message {
                WriterMessage::Apply(job) => {
                    let mut guard = storage.write();
                    job(&mut guard);
                }
                WriterMessage::Shutdown => break,
            }
        }
        tracing::debug!("writer thread stopped");
    }

}

impl<T> Writer<T> {
    /// Submits a mutation job. Returns immediately.
    pub(crate) fn submit(&self, job: MutationJob<T>) {
        // Send can only fail after shutdown, and shutdown only happens on
        // drop, at which point no submitter holds a reference anymore.
        let _ = self.tx.send(WriterMessage::Apply(job));
    }

    /// Number of submitted mutations not yet applied.
    pub(crate) fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl<T> Drop for Writer<T> {
    fn drop(&mut self) {
        let _ = self.tx.send(WriterMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_apply_in_submission_order() {
        let storage = Arc::new(RwLock::new(Vec::new()));
        let writer = Writer::spawn(Arc::clone(&storage));

        for i in 0..100 {
            writer.submit(Box::new(move |vec: &mut Vec<i32>| vec.push(i)));
        }
        drop(writer); // drains the queue

        assert_eq!(*storage.read(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_drains_queued_jobs() {
        let storage = Arc::new(RwLock::new(Vec::new()));
        let writer = Writer::spawn(Arc::clone(&storage));

        // Hold the write lock so nothing can apply until after drop begins.
        {
            let guard = storage.write();
            for i in 0..32 {
                writer.submit(Box::new(move |vec: &mut Vec<i32>| vec.push(i)));
            }
            drop(guard);
        }
        drop(writer);

        assert_eq!(storage.read().len(), 32);
    }
}
