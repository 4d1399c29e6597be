//! Error types for the list and its configuration.
//!
//! The core `insert_front` / `remove` operations have no error channel: a lost
//! validation race is retried silently. Errors only come out of the checked
//! `try_*` operations, the constructors, and [`check_invariants`].
//!
//! [`check_invariants`]: crate::OptimisticList::check_invariants

use crate::list::NodeId;
use core::fmt;

/// Error returned by checked list operations and list constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The identifier does not name a slot of this list.
    OutOfRange {
        /// Offending identifier.
        id: NodeId,
        /// Number of slots in the list.
        capacity: usize,
    },
    /// The node is not reachable from the head.
    NotMember(NodeId),
    /// The node is already reachable from the head.
    AlreadyMember(NodeId),
    /// The layout handed to a constructor does not describe a valid list.
    Corrupt(InvariantError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { id, capacity } => {
                write!(f, "node {id} is out of range for a list of capacity {capacity}")
            }
            Self::NotMember(id) => write!(f, "node {id} is not a member of the list"),
            Self::AlreadyMember(id) => write!(f, "node {id} is already a member of the list"),
            Self::Corrupt(err) => write!(f, "invalid list layout: {err}"),
        }
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corrupt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvariantError> for ListError {
    fn from(err: InvariantError) -> Self {
        Self::Corrupt(err)
    }
}

/// Error returned when the structural list invariant does not hold.
///
/// Carries a human-readable description of the first violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

/// Error returned when a [`ListConfig`](crate::ListConfig) is unusable.
#[derive(Debug)]
pub enum ConfigError {
    /// A list needs at least one slot.
    ZeroCapacity,
    /// The configuration text could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => f.write_str("capacity must be greater than zero"),
            Self::Parse(err) => write!(f, "invalid list configuration: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}
