//! A bounded, blocking FIFO queue for handing values between threads.
//!
//! [`BoundedBlockingQueue`] applies backpressure in both directions: `push`
//! parks the calling thread while the queue is at capacity, and `pop` parks
//! while it is empty. All state lives behind a single mutex with one condition
//! variable per direction.
//!
//! ```
//! use bounded_blocking_queue::BoundedBlockingQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(BoundedBlockingQueue::bounded(2).unwrap());
//! let producer = {
//!     let queue = queue.clone();
//!     thread::spawn(move || {
//!         for i in 0..10 {
//!             queue.push(i);
//!         }
//!     })
//! };
//!
//! for i in 0..10 {
//!     assert_eq!(queue.pop(), i);
//! }
//! producer.join().unwrap();
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

mod signal;
use signal::Signal;


// Upper bound on what `bounded` reserves up front; larger queues grow on demand.
const MAX_PREALLOC: usize = 1024;

/// Returned by [`BoundedBlockingQueue::bounded`] when asked for a zero capacity.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
#[error("queue capacity must be non-zero")]
pub struct ZeroCapacityError;

/// Returned by [`BoundedBlockingQueue::try_push`] when the queue is full.
///
/// The rejected value is handed back to the caller.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("queue is full")]
pub struct TryPushError<T>(pub T);

impl<T> TryPushError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[derive(Debug)]
pub struct BoundedBlockingQueue<T> {
    bounded: Option<usize>,
    v: Mutex<VecDeque<T>>,
    not_full: Signal,
    not_empty: Signal,
}

fn has_room(bounded: Option<usize>, len: usize) -> bool {
    match bounded {
        Some(max_buf) => len < max_buf,
        None => true,
    }
}

impl<T> BoundedBlockingQueue<T> {
    /// Creates a queue with no capacity limit; `push` never blocks.
    pub fn unbounded() -> BoundedBlockingQueue<T> {
        BoundedBlockingQueue::with_bound(None, VecDeque::new())
    }

    /// Creates a queue holding at most `capacity` elements.
    ///
    /// A zero capacity would make every `push` block forever, so it is
    /// rejected rather than treated as a rendezvous.
    pub fn bounded(capacity: usize) -> Result<BoundedBlockingQueue<T>, ZeroCapacityError> {
        if capacity == 0 {
            return Err(ZeroCapacityError);
        }
        Ok(BoundedBlockingQueue::with_bound(
            Some(capacity),
            VecDeque::with_capacity(capacity.min(MAX_PREALLOC)),
        ))
    }

    fn with_bound(bounded: Option<usize>, buf: VecDeque<T>) -> BoundedBlockingQueue<T> {
        BoundedBlockingQueue {
            bounded,
            v: Mutex::new(buf),
            not_full: Signal::new("not_full"),
            not_empty: Signal::new("not_empty"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.v.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value` to the tail of the queue, blocking while the queue is
    /// full.
    ///
    /// There is no timeout: if no consumer ever pops, this never returns.
    pub fn push(&self, value: T) {
        let mut buf = self.lock();
        while !has_room(self.bounded, buf.len()) {
            buf = self.not_full.wait(buf);
        }
        buf.push_back(value);
        drop(buf);
        self.not_empty.notify_one();
    }

    /// Appends `value` if there is room, otherwise hands it back immediately.
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        let mut buf = self.lock();
        if !has_room(self.bounded, buf.len()) {
            return Err(TryPushError(value));
        }
        buf.push_back(value);
        drop(buf);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest element, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut buf = self.lock();
        let value = loop {
            if let Some(value) = buf.pop_front() {
                break value;
            }
            buf = self.not_empty.wait(buf);
        };
        drop(buf);
        self.not_full.notify_one();
        value
    }

    /// Removes the oldest element if there is one. Never blocks.
    pub fn try_pop(&self) -> Option<T> {
        let mut buf = self.lock();
        let value = buf.pop_front()?;
        drop(buf);
        self.not_full.notify_one();
        Some(value)
    }

    /// Number of queued elements at the time of the call.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        !has_room(self.bounded, self.lock().len())
    }

    /// The maximum number of elements, or `None` for an unbounded queue.
    pub fn capacity(&self) -> Option<usize> {
        self.bounded
    }

    /// Returns an iterator that blocks on each element; it never ends.
    pub fn iter(&self) -> Iter<'_, T> {
        self.into_iter()
    }

    /// Returns an iterator over the elements available without blocking.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { queue: self }
    }
}

impl<T> Default for BoundedBlockingQueue<T> {
    fn default() -> BoundedBlockingQueue<T> {
        BoundedBlockingQueue::unbounded()
    }
}

pub struct Iter<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        Some(self.queue.pop())
    }
}

impl<'a, T> IntoIterator for &'a BoundedBlockingQueue<T> {
    type IntoIter = Iter<'a, T>;
    type Item = T;
    fn into_iter(self) -> Self::IntoIter {
        Iter { queue: self }
    }
}

pub struct TryIter<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.queue.try_pop()
    }
}
