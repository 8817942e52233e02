//! # Synchronized Sequence
//!
//! A generic ordered container with inline snapshot reads and serialized,
//! fire-and-forget mutations.

use std::fmt;
use std::ops::{AddAssign, Range};
use std::sync::Arc;

use crossbeam_channel::bounded;
use parking_lot::RwLock;

use crate::error::{SequenceError, SequenceResult};
use crate::notify::{NotifyContext, NotifyHandle};
use crate::sequence::writer::Writer;

/// A thread-safe ordered sequence.
///
/// Any number of threads may query and mutate one instance concurrently,
/// with no external locking:
///
/// - **Queries** run inline on the calling thread under a shared lock and
///   return snapshot copies, never live references into the storage.
/// - **Mutations** are submitted to a per-container writer thread and return
///   immediately. Each applies under the exclusive lock, so readers never
///   observe a partially-applied mutation.
/// - **Completions** (`*_then` variants) run exactly once on the sequence's
///   notification context after the mutation has applied, never on the
///   submitting thread and never on the writer thread.
///
/// Mutations submitted from one thread apply in submission order. Mutations
/// submitted concurrently from different threads apply in some total order;
/// which one wins admission is unspecified.
///
/// ## Usage
///
/// ```rust,ignore
/// let seq = Arc::new(SynchronizedSequence::from_vec(vec![1, 2, 3]));
///
/// seq.append(4);                       // returns before the append applies
/// seq.remove_at_then(0, |removed| {
///     // runs on the notification thread once the removal has applied
///     assert_eq!(removed, Ok(1));
/// });
///
/// seq.flush();                         // settle: all mutations applied
/// assert_eq!(seq.all_elements(), vec![2, 3, 4]);
/// ```
pub struct SynchronizedSequence<T> {
    storage: Arc<RwLock<Vec<T>>>,
    writer: Writer<T>,
    notify: NotifyHandle,
    // Declared after `writer` on purpose: drop order guarantees the writer
    // drains (posting its completions) before a privately-owned context
    // stops delivering them.
    _own_notify: Option<NotifyContext>,
}

// =============================================================================
// Construction
// =============================================================================

impl<T: Clone + Send + Sync + 'static> SynchronizedSequence<T> {
    /// Creates an empty sequence with a private notification context.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a sequence pre-populated from `elements`, with a private
    /// notification context.
    #[must_use]
    pub fn from_vec(elements: Vec<T>) -> Self {
        let ctx = NotifyContext::new();
        let handle = ctx.handle();
        Self::build(elements, handle, Some(ctx))
    }

    /// Creates an empty sequence delivering completions on a shared context.
    #[must_use]
    pub fn with_notify(notify: NotifyHandle) -> Self {
        Self::build(Vec::new(), notify, None)
    }

    /// Creates a pre-populated sequence delivering completions on a shared
    /// context.
    #[must_use]
    pub fn from_vec_with_notify(elements: Vec<T>, notify: NotifyHandle) -> Self {
        Self::build(elements, notify, None)
    }

    fn build(elements: Vec<T>, notify: NotifyHandle, own: Option<NotifyContext>) -> Self {
        let storage = Arc::new(RwLock::new(elements));
        let writer = Writer::spawn(Arc::clone(&storage));
        Self {
            storage,
            writer,
            notify,
            _own_notify: own,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for SynchronizedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> From<Vec<T>> for SynchronizedSequence<T> {
    fn from(elements: Vec<T>) -> Self {
        Self::from_vec(elements)
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for SynchronizedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

// =============================================================================
// Queries - inline, shared lock, snapshot semantics
// =============================================================================

impl<T: Clone + Send + Sync + 'static> SynchronizedSequence<T> {
    /// Returns a copy of the first element, or `None` if empty.
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.storage.read().first().cloned()
    }

    /// Returns a copy of the last element, or `None` if empty.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.storage.read().last().cloned()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Returns `true` if the sequence holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }

    /// Returns a copy of the element at `index`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.storage.read().get(index).cloned()
    }

    /// Returns the valid index range at the time of the call.
    #[must_use]
    pub fn indices(&self) -> Range<usize> {
        0..self.storage.read().len()
    }

    /// Returns a copy of the elements in `range`, or `None` if the range is
    /// out of bounds or inverted.
    #[must_use]
    pub fn get_range(&self, range: Range<usize>) -> Option<Vec<T>> {
        self.storage.read().get(range).map(<[T]>::to_vec)
    }

    /// Returns a full copy of the current contents.
    #[must_use]
    pub fn all_elements(&self) -> Vec<T> {
        self.storage.read().clone()
    }

    /// Returns a copy of the first element satisfying `predicate`.
    #[must_use]
    pub fn first_where<P>(&self, predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let guard = self.storage.read();
        guard.iter().position(predicate).map(|i| guard[i].clone())
    }

    /// Returns a copy of the last element satisfying `predicate`.
    #[must_use]
    pub fn last_where<P>(&self, predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let guard = self.storage.read();
        guard.iter().rposition(predicate).map(|i| guard[i].clone())
    }

    /// Returns the position of the first element satisfying `predicate`.
    #[must_use]
    pub fn index_where<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.storage.read().iter().position(predicate)
    }

    /// Returns a new sequence holding only the elements satisfying
    /// `predicate`, evaluated against one consistent snapshot. The original
    /// is unaffected.
    #[must_use]
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let filtered: Vec<T> = {
            let guard = self.storage.read();
            guard.iter().filter(|x| predicate(*x)).cloned().collect()
        };
        Self::from_vec(filtered)
    }

    /// Returns a new sequence with the elements reordered by `compare`.
    /// The original is unaffected.
    #[must_use]
    pub fn sorted_by<F>(&self, compare: F) -> Self
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut snapshot = self.all_elements();
        snapshot.sort_by(compare);
        Self::from_vec(snapshot)
    }

    /// Applies `transform` to each element of a snapshot, in order.
    #[must_use]
    pub fn map<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&T) -> U,
    {
        self.storage.read().iter().map(transform).collect()
    }

    /// Applies `transform` to each element of a snapshot, dropping the
    /// elements for which it returns `None`.
    #[must_use]
    pub fn compact_map<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&T) -> Option<U>,
    {
        self.storage.read().iter().filter_map(transform).collect()
    }

    /// Folds a snapshot left-to-right into an accumulator.
    #[must_use]
    pub fn fold<U, F>(&self, initial: U, combine: F) -> U
    where
        F: FnMut(U, &T) -> U,
    {
        self.storage.read().iter().fold(initial, combine)
    }

    /// Folds a snapshot left-to-right, mutating the accumulator in place.
    #[must_use]
    pub fn fold_mut<U, F>(&self, initial: U, mut update: F) -> U
    where
        F: FnMut(&mut U, &T),
    {
        let guard = self.storage.read();
        let mut acc = initial;
        for element in guard.iter() {
            update(&mut acc, element);
        }
        acc
    }

    /// Applies `body` to each element of a snapshot, in order.
    ///
    /// `body` runs under the read lock: it must not call back into this
    /// sequence, or the calling thread deadlocks.
    pub fn for_each<F>(&self, body: F)
    where
        F: FnMut(&T),
    {
        self.storage.read().iter().for_each(body);
    }

    /// Returns `true` if any element satisfies `predicate`.
    #[must_use]
    pub fn contains_where<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.storage.read().iter().any(predicate)
    }

    /// Returns `true` if every element satisfies `predicate`.
    #[must_use]
    pub fn all_satisfy<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.storage.read().iter().all(predicate)
    }

    /// Number of submitted mutations not yet applied.
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.writer.pending()
    }
}

impl<T: Clone + Send + fmt::Debug + 'static> SynchronizedSequence<T> {
    /// Returns a textual rendering of a snapshot of the contents.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{:?}", &*self.storage.read())
    }
}

impl<T: Clone + Send + Sync + Ord + 'static> SynchronizedSequence<T> {
    /// Returns all elements sorted ascending. The original is unaffected.
    #[must_use]
    pub fn sorted(&self) -> Vec<T> {
        let mut snapshot = self.all_elements();
        snapshot.sort();
        snapshot
    }
}

impl<T: Clone + Send + PartialEq + 'static> SynchronizedSequence<T> {
    /// Returns the position of the first element equal to `element`.
    #[must_use]
    pub fn first_index_of(&self, element: &T) -> Option<usize> {
        self.storage.read().iter().position(|x| x == element)
    }

    /// Returns `true` if any element equals `element`.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.storage.read().contains(element)
    }
}

// =============================================================================
// Mutations - fire-and-forget, serialized, completions on the notify context
// =============================================================================

impl<T: Clone + Send + 'static> SynchronizedSequence<T> {
    /// Appends `value` to the end.
    pub fn append(&self, value: T) {
        self.writer.submit(Box::new(move |vec| vec.push(value)));
    }

    /// Appends all of `values` to the end, preserving their order.
    pub fn append_many(&self, values: Vec<T>) {
        self.writer.submit(Box::new(move |vec| vec.extend(values)));
    }

    /// Inserts `value` at `index`.
    ///
    /// `index` must be in `[0, len]` when the mutation runs; a concurrent
    /// structural mutation admitted first can invalidate it, in which case
    /// the insert is dropped and a warning is traced. Use [`insert_then`]
    /// to observe the outcome.
    ///
    /// [`insert_then`]: Self::insert_then
    pub fn insert(&self, value: T, index: usize) {
        self.writer.submit(Box::new(move |vec| {
            if index <= vec.len() {
                vec.insert(index, value);
            } else {
                tracing::warn!(index, len = vec.len(), "insert dropped: index out of bounds");
            }
        }));
    }

    /// Inserts `value` at `index`, reporting the outcome on the notification
    /// context: `Ok(())` once applied, or
    /// [`SequenceError::IndexOutOfBounds`] if `index` exceeded the length
    /// when the mutation ran.
    pub fn insert_then<C>(&self, value: T, index: usize, completion: C)
    where
        C: FnOnce(SequenceResult<()>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let outcome = if index <= vec.len() {
                vec.insert(index, value);
                Ok(())
            } else {
                Err(SequenceError::IndexOutOfBounds {
                    index,
                    len: vec.len(),
                })
            };
            notify.post(move || completion(outcome));
        }));
    }

    /// Inserts all of `values` at `index`, preserving their order. Same
    /// index contract as [`insert`](Self::insert).
    pub fn insert_many(&self, values: Vec<T>, index: usize) {
        self.writer.submit(Box::new(move |vec| {
            if index <= vec.len() {
                vec.splice(index..index, values);
            } else {
                tracing::warn!(
                    index,
                    len = vec.len(),
                    "bulk insert dropped: index out of bounds"
                );
            }
        }));
    }

    /// Inserts all of `values` at `index`, reporting the outcome on the
    /// notification context.
    pub fn insert_many_then<C>(&self, values: Vec<T>, index: usize, completion: C)
    where
        C: FnOnce(SequenceResult<()>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let outcome = if index <= vec.len() {
                vec.splice(index..index, values);
                Ok(())
            } else {
                Err(SequenceError::IndexOutOfBounds {
                    index,
                    len: vec.len(),
                })
            };
            notify.post(move || completion(outcome));
        }));
    }

    /// Replaces the element at `index` with `value`.
    ///
    /// Exclusive single-slot write. An out-of-range `index` at execution
    /// time drops the write and traces a warning; use
    /// [`set_then`](Self::set_then) to observe the outcome.
    pub fn set(&self, index: usize, value: T) {
        self.writer.submit(Box::new(move |vec| {
            if let Some(slot) = vec.get_mut(index) {
                *slot = value;
            } else {
                tracing::warn!(index, len = vec.len(), "set dropped: index out of bounds");
            }
        }));
    }

    /// Replaces the element at `index`, reporting the outcome on the
    /// notification context.
    pub fn set_then<C>(&self, index: usize, value: T, completion: C)
    where
        C: FnOnce(SequenceResult<()>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let len = vec.len();
            let outcome = match vec.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(SequenceError::IndexOutOfBounds { index, len }),
            };
            notify.post(move || completion(outcome));
        }));
    }

    /// Removes the element at `index`.
    ///
    /// An out-of-range `index` at execution time drops the removal and
    /// traces a warning; use [`remove_at_then`](Self::remove_at_then) to
    /// receive the removed element or the error.
    pub fn remove_at(&self, index: usize) {
        self.writer.submit(Box::new(move |vec| {
            if index < vec.len() {
                vec.remove(index);
            } else {
                tracing::warn!(index, len = vec.len(), "remove dropped: index out of bounds");
            }
        }));
    }

    /// Removes the element at `index`, delivering `Ok(removed)` or
    /// [`SequenceError::IndexOutOfBounds`] on the notification context.
    pub fn remove_at_then<C>(&self, index: usize, completion: C)
    where
        C: FnOnce(SequenceResult<T>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let outcome = if index < vec.len() {
                Ok(vec.remove(index))
            } else {
                Err(SequenceError::IndexOutOfBounds {
                    index,
                    len: vec.len(),
                })
            };
            notify.post(move || completion(outcome));
        }));
    }

    /// Removes every element satisfying `predicate`.
    pub fn remove_where<P>(&self, predicate: P)
    where
        P: Fn(&T) -> bool + Send + 'static,
    {
        self.writer.submit(Box::new(move |vec| {
            let _ = Self::drain_matching(vec, &predicate);
        }));
    }

    /// Removes every element satisfying `predicate`, delivering the removed
    /// elements on the notification context in removal order (equal to
    /// their original relative order).
    pub fn remove_where_then<P, C>(&self, predicate: P, completion: C)
    where
        P: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(Vec<T>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let removed = Self::drain_matching(vec, &predicate);
            notify.post(move || completion(removed));
        }));
    }

    // Repeated rescan-from-start, preserved from the reference behavior:
    // O(n^2) worst case, but the removal order it yields (original relative
    // order of the matches) is part of the contract.
    fn drain_matching<P>(vec: &mut Vec<T>, predicate: &P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let mut removed = Vec::new();
        while let Some(index) = vec.iter().position(predicate) {
            removed.push(vec.remove(index));
        }
        removed
    }

    /// Removes every element.
    pub fn clear(&self) {
        self.writer.submit(Box::new(Vec::clear));
    }

    /// Removes every element, delivering the full pre-clear contents on the
    /// notification context in their original order.
    pub fn clear_then<C>(&self, completion: C)
    where
        C: FnOnce(Vec<T>) + Send + 'static,
    {
        let notify = self.notify.clone();
        self.writer.submit(Box::new(move |vec| {
            let snapshot = std::mem::take(vec);
            notify.post(move || completion(snapshot));
        }));
    }

    /// Blocks the calling thread until every mutation submitted before this
    /// call has applied.
    ///
    /// Queries do not need this: they are always consistent. It exists to
    /// let a caller establish "my earlier fire-and-forget mutations are now
    /// visible" without registering completions.
    pub fn flush(&self) {
        let (tx, rx) = bounded(1);
        self.writer.submit(Box::new(move |_vec| {
            let _ = tx.send(());
        }));
        let _ = rx.recv();
    }
}

// Compound append: `seq += value` and `seq += vec` are `append`.
impl<T: Clone + Send + 'static> AddAssign<T> for SynchronizedSequence<T> {
    fn add_assign(&mut self, rhs: T) {
        self.append(rhs);
    }
}

impl<T: Clone + Send + 'static> AddAssign<Vec<T>> for SynchronizedSequence<T> {
    fn add_assign(&mut self, rhs: Vec<T>) {
        self.append_many(rhs);
    }
}

impl<T: Clone + Send + fmt::Debug + 'static> fmt::Debug for SynchronizedSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizedSequence")
            .field("elements", &*self.storage.read())
            .field("pending_mutations", &self.writer.pending())
            .finish()
    }
}
