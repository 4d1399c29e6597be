//! Fixed-capacity slot arena and the list head.
//!
//! Neighbour links are identifiers packed into atomic words with [`NIL`] as
//! the terminator. Atomics make the optimistic, lock-free snapshot reads data
//! race free; the slot locks still decide who may *write* a word.

use crate::loom::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::sync::SlotLock;
use crossbeam_utils::CachePadded;

/// Index of a node slot, in `0..capacity`.
pub type NodeId = usize;

/// Word value standing for "no node".
pub(crate) const NIL: usize = usize::MAX;

#[inline]
fn encode(link: Option<NodeId>) -> usize {
    link.unwrap_or(NIL)
}

#[inline]
fn decode(word: usize) -> Option<NodeId> {
    (word != NIL).then_some(word)
}

/// One preallocated node.
///
/// `next`, `prev` and `linked` are written only while `lock` is held.
struct Slot {
    next: AtomicUsize,
    prev: AtomicUsize,
    linked: AtomicBool,
    lock: SlotLock,
}

impl Slot {
    fn new() -> Self {
        Self {
            next: AtomicUsize::new(NIL),
            prev: AtomicUsize::new(NIL),
            linked: AtomicBool::new(false),
            lock: SlotLock::new(),
        }
    }
}

/// The arena of node slots, indexed by [`NodeId`].
pub(crate) struct NodeStore {
    slots: Box<[CachePadded<Slot>]>,
}

impl NodeStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| CachePadded::new(Slot::new())).collect(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn lock(&self, id: NodeId) -> &SlotLock {
        &self.slots[id].lock
    }

    #[inline]
    pub(crate) fn next(&self, id: NodeId) -> Option<NodeId> {
        decode(self.slots[id].next.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn prev(&self, id: NodeId) -> Option<NodeId> {
        decode(self.slots[id].prev.load(Ordering::Acquire))
    }

    /// Caller holds `id`'s lock, or has exclusive access to the list.
    #[inline]
    pub(crate) fn set_next(&self, id: NodeId, next: Option<NodeId>) {
        self.slots[id].next.store(encode(next), Ordering::Release);
    }

    /// Caller holds `id`'s lock, or has exclusive access to the list.
    #[inline]
    pub(crate) fn set_prev(&self, id: NodeId, prev: Option<NodeId>) {
        self.slots[id].prev.store(encode(prev), Ordering::Release);
    }

    /// Exact while `id`'s lock is held; a hint otherwise.
    #[inline]
    pub(crate) fn is_linked(&self, id: NodeId) -> bool {
        self.slots[id].linked.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_linked(&self, id: NodeId, linked: bool) {
        self.slots[id].linked.store(linked, Ordering::Release);
    }
}

/// The list head: first member (or [`NIL`]) and the list-level lock.
pub(crate) struct Head {
    first: AtomicUsize,
    pub(crate) lock: SlotLock,
}

impl Head {
    pub(crate) fn new() -> Self {
        Self {
            first: AtomicUsize::new(NIL),
            lock: SlotLock::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<NodeId> {
        decode(self.first.load(Ordering::Acquire))
    }

    /// Caller holds the list lock, or has exclusive access to the list.
    #[inline]
    pub(crate) fn set(&self, first: Option<NodeId>) {
        self.first.store(encode(first), Ordering::Release);
    }
}
