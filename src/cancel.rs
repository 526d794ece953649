//! Cooperative cancellation token checked at adapter I/O boundaries.
//!
//! The spec's per-task termination signal (SIGUSR1, §5) is realized here as
//! a plain `Arc`-shared flag rather than real signal delivery into blocking
//! reads: adapters poll it with a bounded timeout instead. This is the
//! cancellation-token alternative the design notes (§9) explicitly sanction.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct CancelToken(Arc<(Mutex<bool>, Condvar)>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken(Arc::new((Mutex::new(false), Condvar::new())))
    }

    /// Requests that the task holding this token exit at its next I/O
    /// boundary.
    pub fn cancel(&self) {
        let (lock, cond) = &*self.0;
        *lock.lock().unwrap() = true;
        cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0 .0.lock().unwrap()
    }

    /// Sleeps up to `timeout`, returning early if cancelled. Adapters that
    /// poll a device on an interval use this instead of a plain
    /// `thread::sleep` so shutdown is prompt.
    pub fn wait_timeout(&self, timeout: Duration) {
        let (lock, cond) = &*self.0;
        let guard = lock.lock().unwrap();
        if *guard {
            return;
        }
        let _ = cond.wait_timeout(guard, timeout).unwrap();
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
