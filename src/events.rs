//! Event routing.
//!
//! Events carry no state of their own; routing on either side delegates to
//! the identity map that side already owns. The producer resolves an
//! incoming [`Event`] through its bridge and invokes the widget's
//! [`EventHandler`]; the consumer turns native interactions into events and
//! pushes them at an [`EventSink`].

use crate::diff::{Diff, Event};
use core::fmt;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Receives complete diff batches bound for a consumer.
///
/// The batch is the unit of visibility: implementations hand each [`Diff`]
/// to the transport whole, never in pieces.
pub trait DiffSink {
    fn send_diff(&self, diff: Diff);
}

/// Receives user interaction events bound for a producer.
pub trait EventSink {
    fn send_event(&self, event: Event);
}

/// A producer-side event handler.
///
/// Cheap to clone; the underlying closure is shared. The closure receives the
/// event's payload, if the interaction carried one.
pub struct EventHandler(Arc<Mutex<dyn FnMut(Option<Value>) + Send>>);

impl EventHandler {
    pub fn new<F: FnMut(Option<Value>) + Send + 'static>(handler: F) -> EventHandler {
        EventHandler(Arc::new(Mutex::new(handler)))
    }

    pub fn invoke(&self, value: Option<Value>) {
        (&mut *self.0.lock())(value);
    }
}

impl Clone for EventHandler {
    fn clone(&self) -> EventHandler {
        EventHandler(Arc::clone(&self.0))
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventHandler(..)")
    }
}
