//! Synchronization shim: `loom` types under `--cfg loom`, `std` otherwise.
//!
//! Everything in the crate that touches an atomic, parks a thread or spins goes
//! through here so the model checker sees every interleaving point.

#[cfg(loom)]
pub(crate) use ::loom::{
    hint,
    sync::{atomic, Mutex, MutexGuard},
    thread::{self, Thread},
};

#[cfg(not(loom))]
pub(crate) use std::{
    hint,
    sync::atomic,
    thread::{self, Thread},
};

/// Pause between two optimistic attempts.
///
/// Under loom a plain yield is all the model needs; with `std` the caller's
/// backoff state decides between spinning and yielding.
#[cfg(loom)]
#[inline]
pub(crate) fn retry_pause(_backoff: Option<&crossbeam_utils::Backoff>) {
    ::loom::thread::yield_now();
}

#[cfg(not(loom))]
#[inline]
pub(crate) fn retry_pause(backoff: Option<&crossbeam_utils::Backoff>) {
    match backoff {
        Some(backoff) => backoff.snooze(),
        None => std::hint::spin_loop(),
    }
}
