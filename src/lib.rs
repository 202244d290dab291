//! UI diff protocol.
//!
//! # Conceptual overview
//! Graft lets a declarative UI producer drive native widget trees (views,
//! DOM nodes, controls) across a process, thread, or network boundary,
//! without sharing memory. The producer never touches a native widget;
//! instead it emits an ordered batch of tree mutations per update cycle, and
//! the consumer replays each batch against its own tree of native handles.
//! User interactions flow the other way as tagged events.
//!
//! ## Identity
//! Every widget is named by a [`WidgetId`], an integer allocated by the
//! producer in strictly increasing order and never reused. The implicit root
//! container is [`WidgetId::ROOT`] on both sides; it is the only identifier
//! that exists before the first batch and the only one that survives a
//! clear. Both sides keep their own identity map — abstract nodes on the
//! producer, native handles on the consumer — and agree on nothing but the
//! wire vocabulary.
//!
//! ## Diff batches
//! A [`Diff`] carries everything one cycle changed: children operations
//! (insert, move, remove, clear) on named slots, property changes, and
//! layout modifier replacements. The batch is the unit of visibility: it is
//! built synchronously, flushed whole, and applied whole, in order. An empty
//! batch is a no-op and encodes to `{}`.
//!
//! ## Producer and consumer
//! The [`Bridge`] records mutation calls from the composition engine and
//! hands out one batch per cycle. The [`WidgetDisplay`] applies batches
//! against native widgets built by a [`WidgetFactory`], reaching child
//! lists through the [`Children`] trait. Widget kinds, property slots,
//! children slots, and event slots are all schema-defined integer tags;
//! the consumer ignores tags it does not know, so the two sides can run
//! different schema versions.
//!
//! ## Events
//! A native interaction becomes an [`Event`] addressed by widget identifier
//! and event slot tag. Because events cross the boundary asynchronously, an
//! event can be in flight for a widget the producer has already removed;
//! that race is expected, and such events are dropped. An event for an
//! identifier the producer never allocated is a protocol violation.
//!
//! ## Sessions
//! A [`FrameClock`] marks cycle boundaries. Each producer [`Session`] holds
//! one clock subscription, runs its content once per tick, and flushes over
//! a [`DiffSink`]; cancelling a session releases the subscription and
//! discards any half-built batch. A [`DisplaySession`] applies incoming
//! batches strictly in arrival order.
//!
//! ## Wire encoding
//! Batches and events serialize to JSON. Children operations use a tagged
//! two-element form (`["insert", {...}]`), property and event values are
//! opaque JSON, and a property value that is absent is distinct from one
//! that is explicitly `null`.

pub mod bridge;
pub mod diff;
pub mod display;
mod error;
pub mod events;
pub mod host;
mod id;
#[cfg(test)]
mod test_schema;

pub use crate::bridge::{Bridge, ProtocolWidget};
pub use crate::diff::{
    ChildrenDiff, Diff, Event, LayoutModifierElement, LayoutModifiers, PropertyDiff, Tag,
    WidgetKind, ROOT_CHILDREN_TAG,
};
pub use crate::display::{Children, VecChildren, Widget, WidgetDisplay, WidgetFactory};
pub use crate::error::{DiffError, ProtocolError};
pub use crate::events::{DiffSink, EventHandler, EventSink};
pub use crate::host::{
    transport, ConsumerTransport, DisplaySession, FrameClock, ProducerTransport, Session,
};
pub use crate::id::{IdAllocator, WidgetId};
