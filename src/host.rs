//! Session plumbing: connects a producer and a consumer over channels.
//!
//! The producer half runs on a cooperative single-writer cycle: a
//! [`FrameClock`] tick marks a cycle boundary, the session runs its content
//! against the bridge, and the resulting batch is sent whole. The consumer
//! half applies batches strictly in arrival order. Events cross back
//! asynchronously on their own channel.

use crate::bridge::Bridge;
use crate::diff::{Diff, Event};
use crate::display::WidgetDisplay;
use crate::error::ProtocolError;
use crate::events::{DiffSink, EventSink};
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use log::warn;
use parking_lot::Mutex;

impl DiffSink for Sender<Diff> {
    fn send_diff(&self, diff: Diff) {
        if self.send(diff).is_err() {
            warn!("diff receiver disconnected; batch dropped");
        }
    }
}

impl EventSink for Sender<Event> {
    fn send_event(&self, event: Event) {
        if self.send(event).is_err() {
            warn!("event receiver disconnected; event dropped");
        }
    }
}

/// The producer's end of a transport: batches out, events in.
pub struct ProducerTransport {
    pub diffs: Sender<Diff>,
    pub events: Receiver<Event>,
}

/// The consumer's end of a transport: batches in, events out.
pub struct ConsumerTransport {
    pub diffs: Receiver<Diff>,
    pub events: Sender<Event>,
}

/// Creates an in-process transport pair.
///
/// Each direction is an unbounded ordered channel; a [`Diff`] travels as one
/// value, so a batch is never observed in part.
pub fn transport() -> (ProducerTransport, ConsumerTransport) {
    let (diff_tx, diff_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();
    (
        ProducerTransport {
            diffs: diff_tx,
            events: event_rx,
        },
        ConsumerTransport {
            diffs: diff_rx,
            events: event_tx,
        },
    )
}

struct ClockInner {
    frame: u64,
    subscribers: Vec<Sender<u64>>,
}

/// Drives update cycles.
///
/// Each producer session holds exactly one subscription; dropping the
/// subscription (which is what [`Session::cancel`] does) unsubscribes, and
/// the dead sender is pruned on the next tick. One clock can drive any
/// number of sessions.
pub struct FrameClock {
    inner: Mutex<ClockInner>,
}

impl FrameClock {
    pub fn new() -> FrameClock {
        FrameClock {
            inner: Mutex::new(ClockInner {
                frame: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Subscribes to cycle boundaries. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> Receiver<u64> {
        let (tx, rx) = unbounded();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Advances the clock one frame, waking every live subscription.
    pub fn tick(&self) {
        let mut inner = self.inner.lock();
        inner.frame += 1;
        let frame = inner.frame;
        inner.subscribers.retain(|tx| tx.send(frame).is_ok());
    }

    /// The number of live subscriptions, as of the last tick.
    pub fn subscriptions(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl Default for FrameClock {
    fn default() -> FrameClock {
        FrameClock::new()
    }
}

/// One producer session: a [`Bridge`] plus the content driving it.
///
/// `content` stands in for the composition engine: it is invoked once per
/// observed clock tick and issues mutation calls against the bridge.
pub struct Session<C> {
    bridge: Bridge,
    content: C,
    clock: Option<Receiver<u64>>,
    diffs: Sender<Diff>,
    events: Receiver<Event>,
}

impl<C: FnMut(&mut Bridge)> Session<C> {
    pub fn new(clock: &FrameClock, content: C, transport: ProducerTransport) -> Session<C> {
        Session {
            bridge: Bridge::new(),
            content,
            clock: Some(clock.subscribe()),
            diffs: transport.diffs,
            events: transport.events,
        }
    }

    pub fn bridge(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    /// Pumps the session: delivers pending events into the bridge, then runs
    /// one update cycle per pending tick and flushes each cycle's batch.
    ///
    /// Cycles that change nothing produce no batch. A cancelled session
    /// still routes events but no longer produces.
    pub fn poll(&mut self) -> Result<(), ProtocolError> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.bridge.send_event(&event)?,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let mut pending = 0;
        if let Some(clock) = &self.clock {
            while clock.try_recv().is_ok() {
                pending += 1;
            }
        }
        for _ in 0..pending {
            (self.content)(&mut self.bridge);
            let diff = self.bridge.take_diff();
            if !diff.is_empty() {
                self.diffs.send_diff(diff);
            }
        }
        Ok(())
    }

    /// Cancels the session: releases the clock subscription and halts batch
    /// production. A batch under construction is discarded whole; it is
    /// never visible to the transport.
    pub fn cancel(&mut self) {
        self.clock = None;
        let _ = self.bridge.take_diff();
    }

    pub fn is_cancelled(&self) -> bool {
        self.clock.is_none()
    }
}

/// One consumer session: a [`WidgetDisplay`] fed from a diff channel.
///
/// Application is serialized on the caller: batches apply one at a time, in
/// the order they were produced.
pub struct DisplaySession<T> {
    display: WidgetDisplay<T>,
    diffs: Receiver<Diff>,
}

impl<T: Clone> DisplaySession<T> {
    pub fn new(display: WidgetDisplay<T>, diffs: Receiver<Diff>) -> DisplaySession<T> {
        DisplaySession { display, diffs }
    }

    pub fn display(&self) -> &WidgetDisplay<T> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut WidgetDisplay<T> {
        &mut self.display
    }

    /// Applies every batch that has arrived, in order.
    ///
    /// An error is a protocol desync; the session should be torn down and
    /// rebuilt from an empty tree.
    pub fn poll(&mut self) -> Result<(), ProtocolError> {
        loop {
            match self.diffs.try_recv() {
                Ok(diff) => self.display.apply(&diff)?,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }
}
