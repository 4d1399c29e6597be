use super::slot_lock::{SlotGuard, SlotLock};

/// Most locks any list operation holds at once.
pub(crate) const MAX_LOCKS: usize = 4;

/// A batch of locks acquired in one canonical order and released together.
///
/// Keys are sorted and de-duplicated before anything is locked. Every caller
/// draws from the same total order over keys, so two lock sets can never wait
/// on each other in a cycle, and a key that appears twice (an absent neighbour
/// folded onto the target, or a torn snapshot naming the same node twice) is
/// locked once.
pub(crate) struct LockSet<'a> {
    guards: [Option<SlotGuard<'a>>; MAX_LOCKS],
    held: usize,
}

impl<'a> LockSet<'a> {
    /// Sorts `keys` in place, then locks each distinct key's lock in order.
    pub(crate) fn acquire<K, F>(keys: &mut [K], resolve: F) -> Self
    where
        K: Ord + Copy,
        F: Fn(K) -> &'a SlotLock,
    {
        debug_assert!(keys.len() <= MAX_LOCKS, "lock set overflow: {} keys", keys.len());
        keys.sort_unstable();

        let mut guards: [Option<SlotGuard<'a>>; MAX_LOCKS] = std::array::from_fn(|_| None);
        let mut held = 0;
        let mut last = None;
        for &key in keys.iter() {
            if last == Some(key) {
                continue;
            }
            last = Some(key);
            guards[held] = Some(resolve(key).lock());
            held += 1;
        }

        Self { guards, held }
    }

    /// Number of distinct locks held.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.held
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        // Release in reverse acquisition order.
        for guard in self.guards[..self.held].iter_mut().rev() {
            drop(guard.take());
        }
    }
}
