use std::collections::BTreeSet;
use std::time::Duration;

use crate::model::ResourceKind;

/// Coalesces daemon notifications into one refresh per window.
///
/// The timer is armed exactly when the pending set is non-empty; [`flush`]
/// drains the set and disarms it in one step.
///
/// [`flush`]: Debouncer::flush
#[derive(Debug)]
pub struct Debouncer {
    pending: BTreeSet<ResourceKind>,
    armed: bool,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: BTreeSet::new(),
            armed: false,
            window,
        }
    }

    /// Record a change. Returns the delay to start a timer with, or `None`
    /// when one is already running.
    pub fn notify(&mut self, kind: ResourceKind) -> Option<Duration> {
        self.pending.insert(kind);
        if self.armed {
            None
        } else {
            self.armed = true;
            Some(self.window)
        }
    }

    /// Called when the timer fires.
    pub fn flush(&mut self) -> Vec<ResourceKind> {
        self.armed = false;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
