use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Trailing-edge debouncer keyed by mount handle.
///
/// A notification inside the window pushes the deadline back, so a burst
/// collapses into one re-layout once the container has been quiet for `delay`.
#[derive(Debug)]
pub struct ResizeDebouncer {
    delay: Duration,
    pending: HashMap<u64, Instant>,
}

impl ResizeDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn notify(&mut self, handle: u64, now: Instant) {
        self.pending.insert(handle, now + self.delay);
    }

    pub fn cancel(&mut self, handle: u64) {
        self.pending.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Handles whose window has closed, in handle order. They are no longer pending.
    pub fn take_due(&mut self, now: Instant) -> Vec<u64> {
        let mut due: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(handle, _)| *handle)
            .collect();
        due.sort_unstable();
        for handle in &due {
            self.pending.remove(handle);
        }
        due
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }
}
