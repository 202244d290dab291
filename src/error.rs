//! Protocol errors.
//!
//! There are two failure classes. [`DiffError`] is a construction-time
//! validation failure: the producer was asked to record an operation with
//! inconsistent arguments. It is raised eagerly, never serialized, and only
//! fails the offending call. [`ProtocolError`] means the two sides no longer
//! agree on the widget tree; it is fatal to the session, and the host
//! application should tear the pairing down and rebuild from an empty tree.
//!
//! Stale events and unknown schema tags are not errors. They are dropped
//! with a log diagnostic where they occur.

use crate::id::WidgetId;
use thiserror::Error;

/// A mutation call or diff constructor was given inconsistent arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A `Remove` operation's id list does not enumerate exactly `count`
    /// identifiers.
    #[error("remove count {count} does not match removed id list size {ids}")]
    RemovedIdsMismatch { count: usize, ids: usize },

    /// A widget was registered twice under the same identifier.
    #[error("widget {0} is already registered")]
    DuplicateWidget(WidgetId),

    /// An operation referenced a widget that was never registered, or whose
    /// registration has since been removed.
    #[error("widget {0} is not registered")]
    UnregisteredWidget(WidgetId),

    /// An index does not fit the current length of the children sequence it
    /// addresses.
    #[error("index {index} is out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// The producer and consumer no longer agree on the widget tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// An operation addressed an identifier this side does not hold.
    #[error("unknown widget id {0}")]
    UnknownWidget(WidgetId),

    /// An event named an identifier the producer never allocated. Stale
    /// events for *freed* identifiers are an expected race and are dropped;
    /// an identifier from outside the allocated range can only mean a
    /// corrupted or misrouted session.
    #[error("event for widget id {0}, which was never allocated")]
    EventForUnallocated(WidgetId),
}
