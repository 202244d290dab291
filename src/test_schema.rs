//! A tiny hand-rolled widget schema used by tests: a container, a text
//! label, and a button with a click event. In a real deployment this code
//! is generated from a schema definition; tests keep it small and explicit.

use crate::bridge::{Bridge, ProtocolWidget};
use crate::diff::{
    Event, LayoutModifierElement, PropertyDiff, Tag, WidgetKind, ROOT_CHILDREN_TAG,
};
use crate::display::{move_block, Children, Widget, WidgetDisplay, WidgetFactory};
use crate::events::EventHandler;
use crate::id::WidgetId;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONTAINER_KIND: WidgetKind = 1;
pub const TEXT_KIND: WidgetKind = 2;
pub const BUTTON_KIND: WidgetKind = 3;

/// The container's one children slot.
pub const CHILDREN_TAG: Tag = 1;

pub const TEXT_TAG: Tag = 1;
pub const ENABLED_TAG: Tag = 2;
pub const ON_CLICK_TAG: Tag = 3;

// --- producer side ---

/// Guest-side button. Property setters append a diff only when the value
/// (or, for the click handler, its presence) actually changed.
pub struct GuestButton {
    id: WidgetId,
    text: Mutex<Option<String>>,
    on_click: Mutex<Option<EventHandler>>,
}

impl GuestButton {
    pub fn new(bridge: &mut Bridge) -> Arc<GuestButton> {
        let id = bridge.allocate();
        let button = Arc::new(GuestButton {
            id,
            text: Mutex::new(None),
            on_click: Mutex::new(None),
        });
        bridge
            .add_widget(Arc::clone(&button) as Arc<dyn ProtocolWidget>)
            .expect("freshly allocated id");
        button
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn clone_arc(self: &Arc<Self>) -> Arc<dyn ProtocolWidget> {
        Arc::clone(self) as Arc<dyn ProtocolWidget>
    }

    pub fn set_text(&self, bridge: &mut Bridge, text: Option<&str>) {
        let mut current = self.text.lock();
        let next = text.map(str::to_owned);
        if *current != next {
            bridge.set_property(self.id, TEXT_TAG, next.clone().map(Value::String));
            *current = next;
        }
    }

    pub fn set_on_click(&self, bridge: &mut Bridge, handler: Option<EventHandler>) {
        let mut current = self.on_click.lock();
        let was_present = current.is_some();
        let is_present = handler.is_some();
        *current = handler;
        if was_present != is_present {
            bridge.set_property(self.id, ON_CLICK_TAG, Some(Value::Bool(is_present)));
        }
    }
}

impl ProtocolWidget for GuestButton {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn kind(&self) -> WidgetKind {
        BUTTON_KIND
    }

    fn send_event(&self, event: &Event) {
        if event.tag == ON_CLICK_TAG {
            if let Some(handler) = &*self.on_click.lock() {
                handler.invoke(event.value.clone());
            }
        }
    }
}

/// Guest-side container. Carries no properties of its own.
pub struct GuestContainer {
    id: WidgetId,
}

impl GuestContainer {
    pub fn new(bridge: &mut Bridge) -> Arc<GuestContainer> {
        let id = bridge.allocate();
        let container = Arc::new(GuestContainer { id });
        bridge
            .add_widget(Arc::clone(&container) as Arc<dyn ProtocolWidget>)
            .expect("freshly allocated id");
        container
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }
}

impl ProtocolWidget for GuestContainer {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn kind(&self) -> WidgetKind {
        CONTAINER_KIND
    }

    fn send_event(&self, _event: &Event) {}
}

// --- consumer side ---

/// Stand-in for a native widget handle: cheap to clone, shared state.
#[derive(Clone)]
pub struct TestHandle(Arc<Mutex<TestNode>>);

pub struct TestNode {
    pub kind: WidgetKind,
    pub id: WidgetId,
    pub properties: BTreeMap<Tag, Option<Value>>,
    pub modifiers: Vec<LayoutModifierElement>,
    pub slots: BTreeMap<Tag, Vec<TestHandle>>,
    events: Sender<Event>,
}

impl TestHandle {
    fn new(kind: WidgetKind, id: WidgetId, events: Sender<Event>) -> TestHandle {
        TestHandle(Arc::new(Mutex::new(TestNode {
            kind,
            id,
            properties: BTreeMap::new(),
            modifiers: Vec::new(),
            slots: BTreeMap::new(),
            events,
        })))
    }

    pub fn lock(&self) -> MutexGuard<'_, TestNode> {
        self.0.lock()
    }

    /// Simulates a user clicking this native widget.
    pub fn click(&self) {
        let node = self.0.lock();
        let _ = node.events.send(Event::new(node.id, ON_CLICK_TAG, None));
    }
}

struct SlotRef {
    parent: TestHandle,
    tag: Tag,
}

impl Children<TestHandle> for SlotRef {
    fn insert(&mut self, index: usize, child: TestHandle) {
        self.parent
            .0
            .lock()
            .slots
            .entry(self.tag)
            .or_insert_with(Vec::new)
            .insert(index, child);
    }

    fn move_range(&mut self, from_index: usize, to_index: usize, count: usize) {
        let mut node = self.parent.0.lock();
        let slot = node.slots.entry(self.tag).or_insert_with(Vec::new);
        move_block(slot, from_index, to_index, count);
    }

    fn remove(&mut self, index: usize, count: usize) {
        let mut node = self.parent.0.lock();
        let slot = node.slots.entry(self.tag).or_insert_with(Vec::new);
        slot.drain(index..index + count);
    }

    fn clear(&mut self) {
        let mut node = self.parent.0.lock();
        node.slots.entry(self.tag).or_insert_with(Vec::new).clear();
    }
}

pub struct TestWidget {
    handle: TestHandle,
    slots: BTreeMap<Tag, SlotRef>,
}

impl TestWidget {
    pub fn new(kind: WidgetKind, id: WidgetId, events: Sender<Event>) -> TestWidget {
        let handle = TestHandle::new(kind, id, events);
        let mut slots = BTreeMap::new();
        if kind == CONTAINER_KIND {
            slots.insert(
                CHILDREN_TAG,
                SlotRef {
                    parent: handle.clone(),
                    tag: CHILDREN_TAG,
                },
            );
        }
        TestWidget { handle, slots }
    }

    /// The pre-existing root container the display is seeded with.
    pub fn root(events: Sender<Event>) -> (TestWidget, TestHandle) {
        let handle = TestHandle::new(0, WidgetId::ROOT, events);
        let mut slots = BTreeMap::new();
        slots.insert(
            ROOT_CHILDREN_TAG,
            SlotRef {
                parent: handle.clone(),
                tag: ROOT_CHILDREN_TAG,
            },
        );
        (
            TestWidget {
                handle: handle.clone(),
                slots,
            },
            handle,
        )
    }
}

impl Widget<TestHandle> for TestWidget {
    fn value(&self) -> &TestHandle {
        &self.handle
    }

    fn apply_property(&mut self, diff: &PropertyDiff) {
        let mut node = self.handle.0.lock();
        let known = match node.kind {
            BUTTON_KIND => matches!(diff.tag, TEXT_TAG | ENABLED_TAG | ON_CLICK_TAG),
            TEXT_KIND => matches!(diff.tag, TEXT_TAG | ENABLED_TAG),
            _ => false,
        };
        if known {
            node.properties.insert(diff.tag, diff.value.clone());
        }
    }

    fn apply_layout_modifiers(&mut self, elements: &[LayoutModifierElement]) {
        self.handle.0.lock().modifiers = elements.to_vec();
    }

    fn children(&mut self, tag: Tag) -> Option<&mut dyn Children<TestHandle>> {
        self.slots
            .get_mut(&tag)
            .map(|slot| slot as &mut dyn Children<TestHandle>)
    }
}

pub struct TestFactory {
    events: Sender<Event>,
}

impl TestFactory {
    pub fn new(events: Sender<Event>) -> TestFactory {
        TestFactory { events }
    }
}

impl WidgetFactory<TestHandle> for TestFactory {
    fn create(&mut self, kind: WidgetKind, id: WidgetId) -> Option<Box<dyn Widget<TestHandle>>> {
        match kind {
            CONTAINER_KIND | TEXT_KIND | BUTTON_KIND => {
                Some(Box::new(TestWidget::new(kind, id, self.events.clone())))
            }
            _ => None,
        }
    }
}

/// A display wired to the given event sender.
pub fn display_with_events(events: Sender<Event>) -> (WidgetDisplay<TestHandle>, TestHandle) {
    let (root, root_handle) = TestWidget::root(events.clone());
    let display = WidgetDisplay::new(root, TestFactory::new(events.clone()), events);
    (display, root_handle)
}

/// A display with its own event channel, for consumer-only tests.
pub fn display_fixture() -> (WidgetDisplay<TestHandle>, TestHandle, Receiver<Event>) {
    let (events_tx, events_rx) = unbounded();
    let (display, root_handle) = display_with_events(events_tx);
    (display, root_handle, events_rx)
}
