use crate::loom::atomic::{AtomicBool, Ordering};
use crate::loom::{thread, Thread};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

#[cfg(not(loom))]
use crate::loom::hint;
#[cfg(not(loom))]
use std::cell::UnsafeCell;
#[cfg(loom)]
use crate::loom::{Mutex, MutexGuard};
#[cfg(loom)]
use std::sync::PoisonError;

/// A thread parked on a [`WaitQueue`].
///
/// Shared between the queue and the parked thread so a waker can never touch
/// freed memory, however late it runs.
pub(crate) struct Waiter {
    thread: Thread,
    notified: AtomicBool,
}

impl Waiter {
    fn new() -> Self {
        Self {
            thread: thread::current(),
            notified: AtomicBool::new(false),
        }
    }

    /// Parks the calling thread until a waker hands this waiter a notification.
    ///
    /// Spurious unparks are absorbed here.
    pub(crate) fn wait(&self) {
        while !self.notified.load(Ordering::Acquire) {
            thread::park();
        }
    }

    fn notify(&self) {
        self.notified.store(true, Ordering::Release);
        self.thread.unpark();
    }
}

/// A FIFO queue of parked threads.
///
/// Uses a simple spinlock to protect the queue; it is only taken on the
/// contended path of [`SlotLock`](super::SlotLock) and held for a push or pop.
/// Under loom the spinlock is replaced by a model mutex, since the checker
/// cannot bound a busy-wait.
pub(crate) struct WaitQueue {
    #[cfg(not(loom))]
    waiters: UnsafeCell<VecDeque<Arc<Waiter>>>,
    #[cfg(not(loom))]
    lock: AtomicBool,
    #[cfg(loom)]
    waiters: Mutex<VecDeque<Arc<Waiter>>>,
}

// Safety: `waiters` is only reached through a `QueueGuard`, which holds the queue lock.
unsafe impl Sync for WaitQueue {}
unsafe impl Send for WaitQueue {}

impl WaitQueue {
    #[cfg(not(loom))]
    pub(crate) fn new() -> Self {
        Self {
            waiters: UnsafeCell::new(VecDeque::new()),
            lock: AtomicBool::new(false),
        }
    }

    #[cfg(loom)]
    pub(crate) fn new() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }

    #[cfg(not(loom))]
    pub(crate) fn lock(&self) -> QueueGuard<'_> {
        while self.lock.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }
        QueueGuard { queue: self }
    }

    #[cfg(loom)]
    pub(crate) fn lock(&self) -> QueueGuard<'_> {
        QueueGuard {
            waiters: self.waiters.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Pops the oldest waiter, if any, and wakes it outside the queue lock.
    pub(crate) fn wake_one(&self) {
        let waiter = self.lock().pop_front();
        if let Some(waiter) = waiter {
            waiter.notify();
        }
    }

    /// Returns `true` if no thread is parked on the queue.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Exclusive access to the waiters of a [`WaitQueue`].
pub(crate) struct QueueGuard<'a> {
    #[cfg(not(loom))]
    queue: &'a WaitQueue,
    #[cfg(loom)]
    waiters: MutexGuard<'a, VecDeque<Arc<Waiter>>>,
}

impl QueueGuard<'_> {
    /// Registers the calling thread at the back of the queue.
    pub(crate) fn enqueue_current(&mut self) -> Arc<Waiter> {
        let waiter = Arc::new(Waiter::new());
        self.push_back(Arc::clone(&waiter));
        waiter
    }
}

#[cfg(not(loom))]
impl Deref for QueueGuard<'_> {
    type Target = VecDeque<Arc<Waiter>>;

    fn deref(&self) -> &Self::Target {
        // Safety: the spinlock is held for the guard's lifetime.
        unsafe { &*self.queue.waiters.get() }
    }
}

#[cfg(not(loom))]
impl DerefMut for QueueGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: the spinlock is held for the guard's lifetime.
        unsafe { &mut *self.queue.waiters.get() }
    }
}

#[cfg(not(loom))]
impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.queue.lock.store(false, Ordering::Release);
    }
}

#[cfg(loom)]
impl Deref for QueueGuard<'_> {
    type Target = VecDeque<Arc<Waiter>>;

    fn deref(&self) -> &Self::Target {
        &self.waiters
    }
}

#[cfg(loom)]
impl DerefMut for QueueGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.waiters
    }
}
