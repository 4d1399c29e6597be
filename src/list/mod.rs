//! Concurrent doubly linked list over a fixed node universe.
//!
//! Nodes live in a preallocated arena and are named by their index
//! ([`NodeId`]). A node is a *member* iff it is reachable from the head by
//! following `next`; nodes outside the list keep whatever links they had last.
//!
//! Every slot carries its own lock and the head carries a list-level lock.
//! Mutators never hold a global lock: they lock only the handful of positions
//! around the change, re-validate what they read beforehand, and retry from
//! scratch if another thread got there first.
//!
//! # Example
//!
//! ```rust
//! use tether::OptimisticList;
//!
//! let list = OptimisticList::from_order(8, &[4, 2, 0]).unwrap();
//! list.insert_front(7);
//! list.remove(2);
//! assert_eq!(list.snapshot(), vec![7, 4, 0]);
//! ```

mod protocol;
mod stats;
mod store;

pub use stats::ListStats;
pub use store::NodeId;

use crate::config::{ListConfig, RetryPolicy};
use crate::error::{ConfigError, InvariantError, ListError};
use crate::loom::atomic::{AtomicUsize, Ordering};
use crossbeam_utils::CachePadded;
use core::fmt;
use stats::StatCounters;
use store::{Head, NodeStore};

/// A doubly linked list supporting concurrent `insert_front` and `remove`.
///
/// Share it between threads by reference (e.g. from `std::thread::scope`) or
/// wrap it in an `Arc`. Construction plays the part of lock initialisation and
/// dropping the list tears the locks down, so there is no way to use a list
/// before its locks exist or after they are gone.
pub struct OptimisticList {
    head: CachePadded<Head>,
    store: NodeStore,
    len: AtomicUsize,
    retry: RetryPolicy,
    stats: StatCounters,
}

impl OptimisticList {
    /// Creates an empty list with `capacity` node slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(ListConfig::new(capacity))
    }

    /// Creates an empty list from `config`.
    ///
    /// # Panics
    /// Panics if the configuration is invalid; see [`try_with_config`](Self::try_with_config).
    pub fn with_config(config: ListConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(list) => list,
            Err(err) => panic!("invalid list configuration: {err}"),
        }
    }

    /// Creates an empty list from `config`, rejecting invalid configurations.
    pub fn try_with_config(config: ListConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(capacity = config.capacity, retry = ?config.retry, "created list");

        Ok(Self {
            head: CachePadded::new(Head::new()),
            store: NodeStore::new(config.capacity),
            len: AtomicUsize::new(0),
            retry: config.retry,
            stats: StatCounters::new(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds a quiescent list whose members, front to back, are `order`.
    ///
    /// # Errors
    /// Fails on a zero `capacity`, an id out of range, or an id listed twice.
    pub fn from_order(capacity: usize, order: &[NodeId]) -> Result<Self, ListError> {
        let list = Self::try_with_config(ListConfig::new(capacity))
            .map_err(|err| InvariantError::new(err.to_string()))?;
        for (pos, &id) in order.iter().enumerate() {
            list.check_range(id)?;
            if list.store.is_linked(id) {
                return Err(ListError::AlreadyMember(id));
            }
            list.store.set_linked(id, true);
            list.store.set_prev(id, pos.checked_sub(1).map(|p| order[p]));
            list.store.set_next(id, order.get(pos + 1).copied());
        }
        list.head.set(order.first().copied());
        list.len.store(order.len(), Ordering::Relaxed);
        Ok(list)
    }

    /// Builds a quiescent list from raw link tables.
    ///
    /// `next[i]` and `prev[i]` are node `i`'s neighbours; the capacity is the
    /// table length. Entries of nodes not reachable from `head` are kept as
    /// stale links and otherwise ignored. The reachable part must satisfy the
    /// list invariant.
    pub fn from_links(
        head: Option<NodeId>,
        next: &[Option<NodeId>],
        prev: &[Option<NodeId>],
    ) -> Result<Self, ListError> {
        if next.len() != prev.len() {
            return Err(InvariantError::new(format!(
                "next table has {} entries but prev table has {}",
                next.len(),
                prev.len()
            ))
            .into());
        }
        if next.is_empty() {
            return Err(InvariantError::new("link tables are empty").into());
        }

        let list = Self::new(next.len());
        for (id, (&n, &p)) in next.iter().zip(prev).enumerate() {
            for link in [n, p].into_iter().flatten() {
                list.check_range(link)?;
            }
            list.store.set_next(id, n);
            list.store.set_prev(id, p);
        }
        if let Some(head) = head {
            list.check_range(head)?;
        }
        list.head.set(head);

        let mut len = 0;
        let mut cursor = head;
        while let Some(id) = cursor {
            if list.store.is_linked(id) {
                return Err(InvariantError::new(format!("node {id} is reachable from itself")).into());
            }
            list.store.set_linked(id, true);
            len += 1;
            cursor = list.store.next(id);
        }
        list.len.store(len, Ordering::Relaxed);

        list.check_invariants()?;
        Ok(list)
    }

    /// Number of node slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Current retry policy.
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// First member, or `None` if the list is empty.
    #[inline]
    pub fn head(&self) -> Option<NodeId> {
        self.head.get()
    }

    /// `id`'s successor link. Meaningful for members; stale for non-members.
    ///
    /// # Panics
    /// Panics if `id` is not below [`capacity`](Self::capacity).
    #[inline]
    pub fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.store.next(id)
    }

    /// `id`'s predecessor link. Meaningful for members; stale for non-members.
    ///
    /// # Panics
    /// Panics if `id` is not below [`capacity`](Self::capacity).
    #[inline]
    pub fn prev_of(&self, id: NodeId) -> Option<NodeId> {
        self.store.prev(id)
    }

    /// Whether `id` is currently a member. Out-of-range ids are never members.
    pub fn contains(&self, id: NodeId) -> bool {
        id < self.capacity() && self.store.is_linked(id)
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Returns `true` if the list has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters.
    pub fn stats(&self) -> ListStats {
        self.stats.snapshot()
    }

    /// Walks from the head to the terminator and returns the members in order.
    ///
    /// Diagnostic only: concurrent mutators may make the walk observe a mix of
    /// before and after states. The walk stops after `capacity` steps, so it
    /// terminates whatever it races with.
    pub fn snapshot(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut cursor = self.head();
        while let Some(id) = cursor {
            if order.len() == self.capacity() {
                break;
            }
            order.push(id);
            cursor = self.store.next(id);
        }
        order
    }

    /// Verifies the structural invariant. Call only while no operation is in flight.
    ///
    /// Checks that members form an acyclic chain from the head, that each
    /// member's `prev` names the member before it (`None` for the head), that
    /// exactly the members carry the membership flag, and that the member count
    /// matches.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut seen = vec![false; self.capacity()];
        let mut count = 0;
        let mut before = None;
        let mut cursor = self.head();

        while let Some(id) = cursor {
            if seen[id] {
                return Err(InvariantError::new(format!("node {id} is reachable from itself")));
            }
            seen[id] = true;

            let prev = self.store.prev(id);
            if prev != before {
                return Err(InvariantError::new(format!(
                    "prev({id}) is {prev:?} but the node follows {before:?}"
                )));
            }
            if !self.store.is_linked(id) {
                return Err(InvariantError::new(format!("member {id} is not flagged as linked")));
            }

            count += 1;
            before = Some(id);
            cursor = self.store.next(id);
        }

        if let Some(stray) = (0..self.capacity()).find(|&id| !seen[id] && self.store.is_linked(id)) {
            return Err(InvariantError::new(format!(
                "node {stray} is flagged as linked but unreachable"
            )));
        }
        if count != self.len() {
            return Err(InvariantError::new(format!(
                "walk found {count} members but the list counts {}",
                self.len()
            )));
        }
        Ok(())
    }

    fn check_range(&self, id: NodeId) -> Result<(), ListError> {
        if id < self.capacity() {
            Ok(())
        } else {
            Err(ListError::OutOfRange {
                id,
                capacity: self.capacity(),
            })
        }
    }
}

/// Prints the members front to back, e.g. `4 -> 2 -> 0 -> nil`.
impl fmt::Display for OptimisticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.snapshot() {
            write!(f, "{id} -> ")?;
        }
        f.write_str("nil")
    }
}

impl fmt::Debug for OptimisticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticList")
            .field("capacity", &self.capacity())
            .field("members", &self.snapshot())
            .field("retry", &self.retry)
            .finish()
    }
}
