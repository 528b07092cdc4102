//! Completion signalling between workers and the orchestrating thread
//!
//! Workers bump a settled counter every time a handle reaches a terminal
//! status, and the pool closes the signal when it shuts down. The runner
//! blocks on the condition variable instead of polling.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Progress {
    settled: usize,
    closed: bool,
}

/// Counting completion signal
#[derive(Debug, Default)]
pub struct Completion {
    progress: Mutex<Progress>,
    changed: Condvar,
}

impl Completion {
    /// Creates an open signal with nothing settled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more settled handle and wakes waiters
    pub fn settle(&self) {
        let mut progress = self.progress.lock();
        progress.settled += 1;
        self.changed.notify_all();
    }

    /// Marks the signal closed (pool shut down) and wakes waiters
    pub fn close(&self) {
        let mut progress = self.progress.lock();
        progress.closed = true;
        self.changed.notify_all();
    }

    /// Number of handles settled so far
    #[must_use]
    pub fn settled(&self) -> usize {
        self.progress.lock().settled
    }

    /// Returns true once [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.progress.lock().closed
    }

    /// Blocks until `expected` handles have settled or the signal is closed.
    ///
    /// There is no timeout.
    pub fn wait(&self, expected: usize) {
        let mut progress = self.progress.lock();
        while progress.settled < expected && !progress.closed {
            self.changed.wait(&mut progress);
        }
    }
}
