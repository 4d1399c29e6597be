//! Fork-join drivers that replay operation batches against a shared list.
//!
//! Worker threads claim operations from a shared cursor, so a batch is spread
//! across threads in whatever interleaving the scheduler produces. Each
//! operation must satisfy its caller contract at the moment it runs; batches
//! over disjoint identifiers (every removed id a member, every inserted id
//! not) satisfy it under any interleaving.

use crate::config::ListConfig;
use crate::error::ListError;
use crate::list::{NodeId, OptimisticList};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Capacity of the reference fixture.
pub const REFERENCE_CAPACITY: usize = 11;

/// Front-to-back order of the reference fixture.
pub const REFERENCE_ORDER: [NodeId; 6] = [4, 2, 0, 5, 3, 1];

/// Mixed batch for the reference fixture, in signed form (see [`Op::from_signed`]).
pub const REFERENCE_OPS: [i64; 9] = [6, 9, -3, 7, -4, -2, 10, -1, 8];

/// One list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// [`OptimisticList::insert_front`].
    InsertFront(NodeId),
    /// [`OptimisticList::remove`].
    Remove(NodeId),
}

impl Op {
    /// Decodes the signed batch notation: `n >= 0` inserts `n`, `n < 0` removes `-n`.
    ///
    /// Node 0 can only be inserted in this notation. Returns `None` if the
    /// magnitude does not fit a [`NodeId`].
    pub fn from_signed(value: i64) -> Option<Self> {
        let id = NodeId::try_from(value.unsigned_abs()).ok()?;
        Some(if value < 0 { Self::Remove(id) } else { Self::InsertFront(id) })
    }

    /// Identifier the operation targets.
    pub fn id(self) -> NodeId {
        match self {
            Self::InsertFront(id) | Self::Remove(id) => id,
        }
    }

    /// Runs the operation against `list`.
    #[inline]
    pub fn apply(self, list: &OptimisticList) {
        match self {
            Self::InsertFront(id) => list.insert_front(id),
            Self::Remove(id) => list.remove(id),
        }
    }

    /// Runs the checked variant of the operation against `list`.
    pub fn try_apply(self, list: &OptimisticList) -> Result<(), ListError> {
        match self {
            Self::InsertFront(id) => list.try_insert_front(id),
            Self::Remove(id) => list.try_remove(id),
        }
    }
}

/// Builds the reference fixture `4 -> 2 -> 0 -> 5 -> 3 -> 1` from its link tables.
///
/// Slots past the fixture's members start detached; `config.capacity` must be
/// at least [`REFERENCE_CAPACITY`] for [`REFERENCE_OPS`] to stay in range.
pub fn reference_list(config: &ListConfig) -> Result<OptimisticList, ListError> {
    const NEXT: [Option<NodeId>; 6] = [Some(5), None, Some(0), Some(1), Some(2), Some(3)];
    const PREV: [Option<NodeId>; 6] = [Some(2), Some(3), Some(4), Some(5), None, Some(0)];

    let mut next = vec![None; config.capacity.max(NEXT.len())];
    let mut prev = next.clone();
    next[..NEXT.len()].copy_from_slice(&NEXT);
    prev[..PREV.len()].copy_from_slice(&PREV);

    Ok(OptimisticList::from_links(Some(REFERENCE_ORDER[0]), &next, &prev)?.with_retry(config.retry))
}

/// Decodes a signed batch, rejecting values that do not fit a [`NodeId`].
pub fn decode_signed(values: &[i64]) -> Option<Vec<Op>> {
    values.iter().map(|&v| Op::from_signed(v)).collect()
}

/// Replays `ops` on `threads` scoped worker threads and waits for all of them.
///
/// # Panics
/// Panics if `threads` is zero, or if a worker panics.
pub fn run_scoped(list: &OptimisticList, ops: &[Op], threads: usize) {
    assert!(threads != 0, "threads must be > 0");

    let cursor = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                while let Some(op) = ops.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                    op.apply(list);
                }
            });
        }
    });

    #[cfg(feature = "tracing")]
    tracing::debug!(ops = ops.len(), threads, "scoped batch finished");
}

/// Replays `ops` on the rayon global pool and waits for all of them.
#[cfg(feature = "parallel")]
pub fn run_parallel(list: &OptimisticList, ops: &[Op]) {
    use rayon::prelude::*;

    ops.par_iter().for_each(|op| op.apply(list));

    #[cfg(feature = "tracing")]
    tracing::debug!(ops = ops.len(), "parallel batch finished");
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_from_signed() {
        assert_eq!(Op::from_signed(6), Some(Op::InsertFront(6)));
        assert_eq!(Op::from_signed(-3), Some(Op::Remove(3)));
        assert_eq!(Op::from_signed(0), Some(Op::InsertFront(0)));
        assert_eq!(Op::from_signed(-3).map(Op::id), Some(3));
    }

    #[test]
    fn test_reference_list_shape() {
        let list = reference_list(&ListConfig::new(REFERENCE_CAPACITY)).unwrap();
        assert_eq!(list.snapshot(), REFERENCE_ORDER);
        assert_eq!(list.capacity(), REFERENCE_CAPACITY);
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn test_reference_list_grows_to_fixture_size() {
        let list = reference_list(&ListConfig::new(2)).unwrap();
        assert_eq!(list.capacity(), 6);
    }

    #[test]
    fn test_single_thread_replay_is_sequential() {
        let list = reference_list(&ListConfig::new(REFERENCE_CAPACITY)).unwrap();
        let ops = decode_signed(&REFERENCE_OPS).unwrap();
        run_scoped(&list, &ops, 1);
        assert_eq!(list.snapshot(), vec![8, 10, 7, 9, 6, 0, 5]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_try_apply_surfaces_errors() {
        let list = OptimisticList::new(4);
        assert_eq!(Op::Remove(1).try_apply(&list), Err(ListError::NotMember(1)));
        assert_eq!(Op::InsertFront(1).try_apply(&list), Ok(()));
    }
}
