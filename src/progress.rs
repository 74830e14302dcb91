//! Live progress counter for slow sequential operations.
//!
//! A [`Progress`] is a cheap handle; clone it, hand one copy to the
//! operation and poll the other from anywhere.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Completed vs. total sub-operations.
///
/// `current` never decreases and never exceeds `max`.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    current: AtomicUsize,
    max: AtomicUsize,
}

/// Point-in-time copy of a [`Progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub max: usize,
}

impl ProgressSnapshot {
    /// Completion ratio in `0.0..=1.0` (0 when nothing is planned yet).
    pub fn ratio(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f64 / self.max as f64
        }
    }
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.inner.current.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.inner.max.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        // Read current first so a concurrent grow never yields current > max
        let current = self.current();
        let max = self.max();
        ProgressSnapshot {
            current: current.min(max),
            max,
        }
    }

    /// True once every planned step has completed.
    pub fn is_complete(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.max > 0 && snapshot.current >= snapshot.max
    }

    /// Plan `steps` more sub-operations.
    pub(crate) fn grow(&self, steps: usize) {
        self.inner.max.fetch_add(steps, Ordering::AcqRel);
    }

    /// Record one completed sub-operation.
    pub(crate) fn advance(&self) {
        let max = self.max();
        let _ = self
            .inner
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c < max).then_some(c + 1)
            });
    }

    /// Mark every planned step complete (used when an operation ends early).
    pub(crate) fn finish(&self) {
        let max = self.max();
        self.inner.current.fetch_max(max, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_capped_at_max() {
        let progress = Progress::new();
        progress.grow(2);
        progress.advance();
        progress.advance();
        progress.advance();

        assert_eq!(progress.current(), 2);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_clones_share_state() {
        let progress = Progress::new();
        let observer = progress.clone();
        progress.grow(4);
        progress.advance();

        assert_eq!(
            observer.snapshot(),
            ProgressSnapshot { current: 1, max: 4 }
        );
        assert_eq!(observer.snapshot().ratio(), 0.25);
        assert!(!observer.is_complete());
    }

    #[test]
    fn test_finish_jumps_to_max() {
        let progress = Progress::new();
        progress.grow(10);
        progress.advance();
        progress.finish();

        assert_eq!(progress.current(), 10);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_empty_progress_is_not_complete() {
        let progress = Progress::new();
        assert!(!progress.is_complete());
        assert_eq!(progress.snapshot().ratio(), 0.0);
    }
}
