//! Blocking primitives behind the list's per-node locks.
//!
//! [`SlotLock`] spins briefly and then parks on a FIFO wait queue. The list
//! never takes more than one lock at a time by hand: it gathers the keys an
//! attempt needs and hands them to a `LockSet`, which acquires them in one
//! canonical order.

mod lock_set;
mod slot_lock;
mod wait_queue;

pub(crate) use lock_set::LockSet;
pub use slot_lock::{SlotGuard, SlotLock};
