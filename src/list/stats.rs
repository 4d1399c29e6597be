use crate::loom::atomic::{AtomicU64, Ordering};
use crossbeam_utils::CachePadded;
use serde::{Deserialize, Serialize};

/// Point-in-time operation counters of an [`OptimisticList`](crate::OptimisticList).
///
/// Counters are relaxed: a snapshot taken while operations are in flight is
/// not a consistent cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListStats {
    /// Committed front insertions.
    pub inserts: u64,
    /// Committed removals.
    pub removes: u64,
    /// Attempts that failed validation and were retried.
    pub validation_failures: u64,
}

impl ListStats {
    /// Committed operations of either kind.
    pub fn commits(&self) -> u64 {
        self.inserts + self.removes
    }
}

/// Each counter sits on its own cache line; every thread bumps them.
pub(crate) struct StatCounters {
    inserts: CachePadded<AtomicU64>,
    removes: CachePadded<AtomicU64>,
    validation_failures: CachePadded<AtomicU64>,
}

impl StatCounters {
    pub(crate) fn new() -> Self {
        Self {
            inserts: CachePadded::new(AtomicU64::new(0)),
            removes: CachePadded::new(AtomicU64::new(0)),
            validation_failures: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ListStats {
        ListStats {
            inserts: self.inserts.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }
}
