//! Stack operation statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a [`DiskStack`](crate::DiskStack).
///
/// All fields are atomic for lock-free, thread-safe updates.
///
/// # Memory Ordering
/// We use `Ordering::Relaxed` for all operations because:
/// - We only need atomicity (no partial updates)
/// - We don't need synchronization between different counters
/// - Statistics are "eventually consistent" - exact ordering doesn't matter
///
/// The authoritative element count and byte size live under the stack's
/// lock; these counters are for observation only.
#[derive(Debug, Default)]
pub struct StackStats {
    /// Successful pushes.
    pub pushes: AtomicU64,

    /// Pops that returned an element.
    pub pops: AtomicU64,

    /// Pops that found the stack empty.
    pub empty_pops: AtomicU64,

    /// Frame bytes written by pushes.
    pub bytes_appended: AtomicU64,

    /// Frame bytes truncated away by pops.
    pub bytes_reclaimed: AtomicU64,
}

impl StackStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_push(&self, frame_size: u64) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(frame_size, Ordering::Relaxed);
    }

    pub(crate) fn record_pop(&self, frame_size: u64) {
        self.pops.fetch_add(1, Ordering::Relaxed);
        self.bytes_reclaimed.fetch_add(frame_size, Ordering::Relaxed);
    }

    pub(crate) fn record_empty_pop(&self) {
        self.empty_pops.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    ///
    /// This returns a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pushes: self.pushes.load(Ordering::Relaxed),
            pops: self.pops.load(Ordering::Relaxed),
            empty_pops: self.empty_pops.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            bytes_reclaimed: self.bytes_reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.pushes.store(0, Ordering::Relaxed);
        self.pops.store(0, Ordering::Relaxed);
        self.empty_pops.store(0, Ordering::Relaxed);
        self.bytes_appended.store(0, Ordering::Relaxed);
        self.bytes_reclaimed.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of stack statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub pushes: u64,
    pub pops: u64,
    pub empty_pops: u64,
    pub bytes_appended: u64,
    pub bytes_reclaimed: u64,
}

impl StatsSnapshot {
    /// Fraction of pop attempts that found the stack empty (0.0 to 1.0).
    pub fn empty_rate(&self) -> f64 {
        let total = self.pops + self.empty_pops;
        if total == 0 {
            0.0
        } else {
            self.empty_pops as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ pushes: {}, pops: {}, empty_pops: {}, appended: {}B, reclaimed: {}B }}",
            self.pushes, self.pops, self.empty_pops, self.bytes_appended, self.bytes_reclaimed
        )
    }
}
