//! # `tether` - Lock-Coupled Optimistic Linked List
//!
//! A concurrent doubly linked list over a fixed, preallocated node universe.
//! Threads insert at the front and remove by identifier at the same time,
//! without a global lock around the structure.
//!
//! ## Locking Protocol
//!
//! ### Per-position locks
//! - **One lock per node slot** guards that node's `next`/`prev` links.
//! - **One list lock** guards the head reference.
//! - A writer holds the locks of exactly the positions it changes: predecessor
//!   (or the list lock), target and successor for a removal; list lock, old
//!   head and new node for a front insertion.
//!
//! ### Optimistic validation
//! - Neighbours are read **without** locks, so the read may be stale.
//! - Once the implicated locks are held the read is re-checked against the
//!   frozen state. A mismatch releases every lock and the attempt starts over;
//!   nothing is patched in place.
//!
//! ### Deadlock freedom
//! - Each attempt acquires its locks through one canonical total order (list
//!   lock, then node locks by ascending identifier). No attempt holds a lock
//!   while waiting for one that precedes it, so no wait cycle can form.
//!
//! ## Caller Contracts
//!
//! [`OptimisticList::remove`] expects a member and [`OptimisticList::insert_front`]
//! a non-member. Membership is tracked under each node's own lock, so debug
//! builds assert both contracts and the checked `try_*` variants report
//! violations as [`ListError`]s.
//!
//! ## Example
//!
//! ```rust
//! use tether::OptimisticList;
//!
//! let list = OptimisticList::from_order(11, &[4, 2, 0, 5, 3, 1]).unwrap();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| list.remove(3));
//!     s.spawn(|| list.remove(2));
//!     s.spawn(|| list.insert_front(6));
//! });
//!
//! assert_eq!(list.len(), 5);
//! assert_eq!(list.snapshot()[1..], [4, 0, 5, 1]);
//! list.check_invariants().unwrap();
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod list;
pub mod sync;
pub mod workload;

pub(crate) mod loom;

pub use config::{ListConfig, RetryPolicy};
pub use error::{ConfigError, InvariantError, ListError};
pub use list::{ListStats, NodeId, OptimisticList};
pub use sync::{SlotGuard, SlotLock};
pub use workload::Op;

// Compile-time assertions for layout claims
const _: () = {
    use core::mem;

    // A guard is a single borrowed reference.
    assert!(mem::size_of::<SlotGuard<'static>>() == mem::size_of::<usize>());
};
