//! The optimistic lock-coupling protocols.
//!
//! Both mutators follow the same shape:
//!
//! 1. read the neighbourhood without any lock (the snapshot may be stale),
//! 2. lock every position the snapshot implicates,
//! 3. re-validate the snapshot against the now frozen state,
//! 4. commit, or release everything and start over.
//!
//! Nothing is ever repaired in place. A failed validation throws the whole
//! attempt away, and no lock survives into the next attempt.
//!
//! Locks are acquired through a [`LockSet`], i.e. in one canonical order: the
//! list lock first, then node locks by ascending identifier. Taking them in
//! list position order instead (predecessor, target, successor for `remove`;
//! old head, list, new node for `insert_front`) lets `remove(head)` and
//! `insert_front` each hold the lock the other waits for.

use super::{NodeId, OptimisticList};
use crate::error::ListError;
use crate::loom::{atomic::Ordering, retry_pause};
use crate::sync::LockSet;

/// Lock identities in canonical acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LockKey {
    List,
    Node(NodeId),
}

impl OptimisticList {
    /// Reports whether `prev` is immediately followed by `curr`.
    ///
    /// - `prev == None`: `curr` is the head (both `None` means the list is empty).
    /// - `curr == None`: `prev` is the last member.
    /// - otherwise: `next(prev) == curr` and `prev(curr) == prev`.
    ///
    /// Takes no locks. The answer is authoritative only while the caller holds
    /// the locks of the positions involved, or while the list is quiescent.
    pub fn validate(&self, prev: Option<NodeId>, curr: Option<NodeId>) -> bool {
        match (prev, curr) {
            (None, curr) => self.head.get() == curr,
            (Some(prev), None) => self.store.next(prev).is_none(),
            (Some(prev), Some(curr)) => {
                self.store.next(prev) == Some(curr) && self.store.prev(curr) == Some(prev)
            }
        }
    }

    /// Unlinks `id` from the list.
    ///
    /// The caller guarantees that `id` is a member and that no other thread
    /// removes it concurrently. Debug builds assert membership; release builds
    /// leave a non-member untouched.
    ///
    /// # Panics
    /// Panics if `id` is not below [`capacity`](Self::capacity).
    pub fn remove(&self, id: NodeId) {
        let outcome = self.unlink(id);
        debug_assert!(outcome.is_ok(), "remove({id}) broke the caller contract: {outcome:?}");
    }

    /// Checked [`remove`](Self::remove).
    ///
    /// Membership is decided while `id`'s lock is held, so the answer is exact
    /// at the instant the operation takes effect.
    pub fn try_remove(&self, id: NodeId) -> Result<(), ListError> {
        self.check_range(id)?;
        self.unlink(id)
    }

    /// Links `id` in as the new first node.
    ///
    /// The caller guarantees that `id` is not a member. Debug builds assert
    /// this; release builds leave the list untouched.
    ///
    /// # Panics
    /// Panics if `id` is not below [`capacity`](Self::capacity).
    pub fn insert_front(&self, id: NodeId) {
        let outcome = self.link_front(id);
        debug_assert!(outcome.is_ok(), "insert_front({id}) broke the caller contract: {outcome:?}");
    }

    /// Checked [`insert_front`](Self::insert_front).
    pub fn try_insert_front(&self, id: NodeId) -> Result<(), ListError> {
        self.check_range(id)?;
        self.link_front(id)
    }

    fn unlink(&self, id: NodeId) -> Result<(), ListError> {
        let backoff = self.retry.backoff();
        loop {
            let prev = self.store.prev(id);
            let next = self.store.next(id);

            // A missing successor folds onto the target key and is deduplicated.
            let mut keys = [
                prev.map_or(LockKey::List, LockKey::Node),
                LockKey::Node(id),
                next.map_or(LockKey::Node(id), LockKey::Node),
            ];
            let window = self.lock_window(&mut keys);

            if !self.store.is_linked(id) {
                return Err(ListError::NotMember(id));
            }

            if self.validate(prev, Some(id)) && self.validate(Some(id), next) {
                match prev {
                    None => self.head.set(next),
                    Some(prev) => self.store.set_next(prev, next),
                }
                if let Some(next) = next {
                    self.store.set_prev(next, prev);
                }
                self.store.set_linked(id, false);
                self.len.fetch_sub(1, Ordering::Relaxed);
                drop(window);

                self.stats.record_remove();
                #[cfg(feature = "tracing")]
                tracing::trace!(id, ?prev, ?next, "removed node");
                return Ok(());
            }

            drop(window);
            self.stats.record_validation_failure();
            #[cfg(feature = "tracing")]
            tracing::trace!(id, ?prev, ?next, "remove snapshot went stale; retrying");
            retry_pause(backoff.as_ref());
        }
    }

    fn link_front(&self, id: NodeId) -> Result<(), ListError> {
        let backoff = self.retry.backoff();
        loop {
            let head = self.head.get();

            // An empty list folds the head key onto the list key.
            let mut keys = [
                LockKey::List,
                head.map_or(LockKey::List, LockKey::Node),
                LockKey::Node(id),
            ];
            let window = self.lock_window(&mut keys);

            if self.store.is_linked(id) {
                return Err(ListError::AlreadyMember(id));
            }

            // The head is the only fact the insertion depends on.
            if self.validate(None, head) {
                if let Some(head) = head {
                    self.store.set_prev(head, Some(id));
                }
                self.store.set_next(id, head);
                self.store.set_prev(id, None);
                self.head.set(Some(id));
                self.store.set_linked(id, true);
                self.len.fetch_add(1, Ordering::Relaxed);
                drop(window);

                self.stats.record_insert();
                #[cfg(feature = "tracing")]
                tracing::trace!(id, ?head, "inserted node at front");
                return Ok(());
            }

            drop(window);
            self.stats.record_validation_failure();
            #[cfg(feature = "tracing")]
            tracing::trace!(id, ?head, "head moved before insert; retrying");
            retry_pause(backoff.as_ref());
        }
    }

    fn lock_window<'a>(&'a self, keys: &mut [LockKey]) -> LockSet<'a> {
        LockSet::acquire(keys, |key| match key {
            LockKey::List => &self.head.lock,
            LockKey::Node(id) => self.store.lock(id),
        })
    }
}
