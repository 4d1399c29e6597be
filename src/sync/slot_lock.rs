use super::wait_queue::WaitQueue;
use crate::loom::atomic::{AtomicU8, Ordering};
use crate::loom::hint;
use core::fmt;

#[cfg(not(loom))]
const SPIN_LIMIT: u32 = 40;
#[cfg(loom)]
const SPIN_LIMIT: u32 = 1;

/// A blocking lock with no payload of its own.
///
/// Each list slot (and the list head) owns one. The words it guards live next
/// to it and are only written while the lock is held; they may still be read
/// without it, which is why the lock cannot own them.
///
/// # States
/// - 0: Unlocked
/// - 1: Locked, no waiters
/// - 2: Locked, waiters may be parked (contended)
pub struct SlotLock {
    state: AtomicU8,
    queue: WaitQueue,
}

impl SlotLock {
    const UNLOCKED: u8 = 0;
    const LOCKED: u8 = 1;
    const CONTENDED: u8 = 2;

    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::UNLOCKED),
            queue: WaitQueue::new(),
        }
    }

    /// Acquires the lock, blocking the current thread until it is available.
    #[inline]
    pub fn lock(&self) -> SlotGuard<'_> {
        if self
            .state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_slow();
        }
        SlotGuard { lock: self }
    }

    /// Attempts to acquire the lock without blocking.
    #[inline]
    pub fn try_lock(&self) -> Option<SlotGuard<'_>> {
        self.state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SlotGuard { lock: self })
    }

    /// Returns `true` if some thread currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != Self::UNLOCKED
    }

    #[cold]
    fn lock_slow(&self) {
        // Once a thread has parked it must take the lock as contended, or the
        // waiters queued behind it would never be woken.
        let mut acquire_as = Self::LOCKED;
        let mut spin_count = 0;
        loop {
            if self.state.load(Ordering::Relaxed) == Self::UNLOCKED
                && self
                    .state
                    .compare_exchange(Self::UNLOCKED, acquire_as, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            if spin_count < SPIN_LIMIT {
                spin_count += 1;
                hint::spin_loop();
                continue;
            }

            let waiter = {
                let mut queue = self.queue.lock();
                // Publishing CONTENDED and enqueueing happen under the queue lock,
                // so an unlocker that sees CONTENDED always finds us queued.
                if self.state.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED {
                    return;
                }
                queue.enqueue_current()
            };
            waiter.wait();

            acquire_as = Self::CONTENDED;
            spin_count = 0;
        }
    }

    fn unlock(&self) {
        if self.state.swap(Self::UNLOCKED, Ordering::Release) == Self::CONTENDED {
            self.unlock_slow();
        }
    }

    #[cold]
    fn unlock_slow(&self) {
        self.queue.wake_one();
    }

    #[cfg(test)]
    pub(crate) fn has_waiters(&self) -> bool {
        !self.queue.is_empty()
    }
}

impl Default for SlotLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlotLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// RAII guard for a held [`SlotLock`]; releases it on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SlotGuard<'a> {
    lock: &'a SlotLock,
}

impl fmt::Debug for SlotGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SlotGuard")
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_lock_and_release() {
        let lock = SlotLock::new();
        {
            let _guard = lock.lock();
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_contended_lock_parks_and_wakes() {
        let lock = SlotLock::new();
        let lock = &lock;

        thread::scope(|s| {
            let guard = lock.lock();
            let waiter = s.spawn(move || {
                let _guard = lock.lock();
            });

            // Give the waiter time to exhaust its spin budget and park.
            while !lock.has_waiters() {
                thread::sleep(Duration::from_millis(1));
            }
            drop(guard);
            waiter.join().unwrap();
        });

        assert!(!lock.is_locked());
        assert!(!lock.has_waiters());
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        let lock = SlotLock::new();
        let inside = AtomicUsize::new(0);
        let total = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let _guard = lock.lock();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        total.fetch_add(1, Ordering::Relaxed);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(total.load(Ordering::Relaxed), 4000);
        assert!(!lock.is_locked());
    }
}
