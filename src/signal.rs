use std::sync::{Condvar, MutexGuard, PoisonError};
use tracing::trace;

/// One side of the queue's wait/notify handshake.
///
/// A `Signal` is always used together with the queue's mutex: waiters hand in
/// the guard they hold and get it back once woken. The signal carries no state
/// of its own, so callers must re-check their predicate after every `wait`.
#[derive(Debug)]
pub(crate) struct Signal {
    name: &'static str,
    condvar: Condvar,
}

impl Signal {
    pub(crate) fn new(name: &'static str) -> Signal {
        Signal {
            name,
            condvar: Condvar::new(),
        }
    }

    /// Releases `guard`, parks until notified (or spuriously woken), and
    /// reacquires the lock before returning.
    pub(crate) fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        trace!(signal = self.name, "parking");
        // The queue never runs foreign code under the lock, so a poisoned guard
        // still protects consistent state.
        let guard = self
            .condvar
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner);
        trace!(signal = self.name, "woken");
        guard
    }

    /// Wakes at most one thread parked in `wait`.
    ///
    /// Callers release the lock before notifying so the woken thread doesn't
    /// immediately block on the mutex again.
    pub(crate) fn notify_one(&self) {
        self.condvar.notify_one();
    }
}
