//! The diff producer.
//!
//! A [`Bridge`] sits between the composition engine and the transport. The
//! engine issues mutation calls against one named children slot of one
//! parent at a time; the bridge records them, together with property and
//! layout modifier changes, as one [`Diff`] batch per update cycle, and
//! keeps the producer-side identity map current.
//!
//! The bridge is the single writer of its batch. Batch construction never
//! blocks and never suspends; a batch is either taken whole with
//! [`Bridge::take_diff`] or discarded whole, never observed in part.

use crate::diff::{
    ChildrenDiff, Diff, Event, LayoutModifierElement, LayoutModifiers, PropertyDiff, Tag,
    WidgetKind,
};
use crate::display::move_block;
use crate::error::{DiffError, ProtocolError};
use crate::id::{IdAllocator, WidgetId};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

/// A producer-side widget registered with a [`Bridge`].
///
/// This is the abstract twin of the native widget the consumer will build:
/// it knows its identity, the schema kind the consumer should instantiate,
/// and how to dispatch interaction events into the composition engine.
pub trait ProtocolWidget: Send + Sync {
    /// The identity this widget was allocated.
    fn id(&self) -> WidgetId;

    /// The schema kind tag naming the concrete widget to instantiate.
    fn kind(&self) -> WidgetKind;

    /// Dispatches a user interaction event into this widget's handler.
    ///
    /// Unknown event tags must be ignored.
    fn send_event(&self, event: &Event);
}

struct Node {
    /// `None` only for the implicit root container.
    widget: Option<Arc<dyn ProtocolWidget>>,
    slots: HashMap<Tag, Vec<WidgetId>>,
}

/// Producer-side protocol state: the identity map, the identifier allocator,
/// and the batch under construction.
pub struct Bridge {
    allocator: IdAllocator,
    nodes: HashMap<WidgetId, Node>,
    batch: Diff,
}

impl Bridge {
    /// Creates a bridge holding only the root container.
    pub fn new() -> Bridge {
        let mut nodes = HashMap::new();
        nodes.insert(
            WidgetId::ROOT,
            Node {
                widget: None,
                slots: HashMap::new(),
            },
        );
        Bridge {
            allocator: IdAllocator::new(),
            nodes,
            batch: Diff::new(),
        }
    }

    /// Allocates an identity for a widget about to be created.
    pub fn allocate(&mut self) -> WidgetId {
        self.allocator.allocate()
    }

    /// Registers a newly created widget under its allocated identity.
    ///
    /// Must happen before any insert referencing the widget is recorded.
    pub fn add_widget(&mut self, widget: Arc<dyn ProtocolWidget>) -> Result<(), DiffError> {
        let id = widget.id();
        if self.nodes.contains_key(&id) {
            return Err(DiffError::DuplicateWidget(id));
        }
        self.nodes.insert(
            id,
            Node {
                widget: Some(widget),
                slots: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Unregisters a widget and all of its descendants, and retires their
    /// identities. Already-removed identifiers are ignored.
    pub fn remove_widget(&mut self, id: WidgetId) {
        if id.is_root() {
            return;
        }
        if let Some(node) = self.nodes.remove(&id) {
            self.allocator.free(id);
            for (_, slot) in node.slots {
                for child in slot {
                    self.remove_widget(child);
                }
            }
        }
    }

    /// Records the insertion of `child` into slot `tag` of `parent`, at
    /// `index` counted after insertion.
    ///
    /// The child must already be registered via [`Bridge::add_widget`]; its
    /// schema kind travels with the operation so the consumer can build it.
    pub fn insert(
        &mut self,
        parent: WidgetId,
        tag: Tag,
        child: WidgetId,
        index: usize,
    ) -> Result<(), DiffError> {
        let kind = match self.nodes.get(&child).and_then(|n| n.widget.as_ref()) {
            Some(widget) => widget.kind(),
            None => return Err(DiffError::UnregisteredWidget(child)),
        };
        let slot = match self.nodes.get_mut(&parent) {
            Some(node) => node.slots.entry(tag).or_insert_with(Vec::new),
            None => return Err(DiffError::UnregisteredWidget(parent)),
        };
        if index > slot.len() {
            return Err(DiffError::IndexOutOfBounds {
                index,
                len: slot.len(),
            });
        }
        slot.insert(index, child);
        self.batch.children_diffs.push(ChildrenDiff::Insert {
            id: parent,
            tag,
            child_id: child,
            kind,
            index,
        });
        Ok(())
    }

    /// Records a block move of `count` children of `parent`'s slot `tag`.
    ///
    /// Both indices are positions before the move. A self-move is accepted
    /// and recorded even though it changes nothing.
    pub fn move_children(
        &mut self,
        parent: WidgetId,
        tag: Tag,
        from_index: usize,
        to_index: usize,
        count: usize,
    ) -> Result<(), DiffError> {
        let slot = match self.nodes.get_mut(&parent) {
            Some(node) => node.slots.entry(tag).or_insert_with(Vec::new),
            None => return Err(DiffError::UnregisteredWidget(parent)),
        };
        let len = slot.len();
        if from_index + count > len {
            return Err(DiffError::IndexOutOfBounds {
                index: from_index + count,
                len,
            });
        }
        if to_index > len {
            return Err(DiffError::IndexOutOfBounds { index: to_index, len });
        }
        move_block(slot, from_index, to_index, count);
        self.batch.children_diffs.push(ChildrenDiff::Move {
            id: parent,
            tag,
            from_index,
            to_index,
            count,
        });
        Ok(())
    }

    /// Records the removal of `count` contiguous children of `parent`'s slot
    /// `tag`, starting at `index`.
    ///
    /// The removed widgets and their descendants are unregistered and their
    /// identities retired; the operation names the removed identifiers so
    /// the consumer can do the same.
    pub fn remove_children(
        &mut self,
        parent: WidgetId,
        tag: Tag,
        index: usize,
        count: usize,
    ) -> Result<(), DiffError> {
        let removed: Vec<WidgetId> = {
            let slot = match self.nodes.get_mut(&parent) {
                Some(node) => node.slots.entry(tag).or_insert_with(Vec::new),
                None => return Err(DiffError::UnregisteredWidget(parent)),
            };
            if index + count > slot.len() {
                return Err(DiffError::IndexOutOfBounds {
                    index: index + count,
                    len: slot.len(),
                });
            }
            slot.drain(index..index + count).collect()
        };
        for &id in &removed {
            self.remove_widget(id);
        }
        let diff = ChildrenDiff::remove(parent, tag, index, count, removed)?;
        self.batch.children_diffs.push(diff);
        Ok(())
    }

    /// Records the removal of the entire tree. Only the root survives.
    pub fn clear(&mut self) {
        let ids: Vec<WidgetId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !id.is_root())
            .collect();
        for id in ids {
            self.nodes.remove(&id);
            self.allocator.free(id);
        }
        if let Some(root) = self.nodes.get_mut(&WidgetId::ROOT) {
            root.slots.clear();
        }
        self.batch.children_diffs.push(ChildrenDiff::Clear);
    }

    /// Records a property change.
    ///
    /// The widget need not be inserted yet; the change is buffered until the
    /// batch is taken, and children operations apply before property changes
    /// on the consumer, so setting properties on a widget inserted later in
    /// the same cycle is legal.
    pub fn set_property(&mut self, id: WidgetId, tag: Tag, value: Option<Value>) {
        debug_assert!(
            self.allocator.was_allocated(id),
            "property set on unallocated widget {}",
            id
        );
        self.batch.property_diffs.push(PropertyDiff::new(id, tag, value));
    }

    /// Records a full replacement of a widget's layout modifier set.
    pub fn set_layout_modifiers(&mut self, id: WidgetId, elements: Vec<LayoutModifierElement>) {
        debug_assert!(
            self.allocator.was_allocated(id),
            "layout modifiers set on unallocated widget {}",
            id
        );
        self.batch.layout_modifiers.push(LayoutModifiers { id, elements });
    }

    /// Takes the batch built so far, leaving an empty one.
    ///
    /// Called once per update cycle; the returned batch is handed to the
    /// transport as a whole.
    pub fn take_diff(&mut self) -> Diff {
        mem::take(&mut self.batch)
    }

    /// Whether the batch under construction has any operations.
    pub fn has_changes(&self) -> bool {
        !self.batch.is_empty()
    }

    /// Routes an incoming user interaction event to the widget it names.
    ///
    /// Events for identifiers that were once allocated but have since been
    /// freed are an expected race (the consumer had not yet observed the
    /// removal when the interaction fired) and are dropped. Events for
    /// identifiers this bridge never allocated are a protocol violation.
    pub fn send_event(&self, event: &Event) -> Result<(), ProtocolError> {
        match self.nodes.get(&event.id) {
            Some(node) => {
                if let Some(widget) = &node.widget {
                    widget.send_event(event);
                } else {
                    debug!("dropping event with tag {} for the root container", event.tag);
                }
                Ok(())
            }
            None if self.allocator.was_allocated(event.id) => {
                debug!(
                    "dropping stale event with tag {} for removed widget {}",
                    event.tag, event.id
                );
                Ok(())
            }
            None => Err(ProtocolError::EventForUnallocated(event.id)),
        }
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All currently registered identifiers, in ascending order. The root is
    /// always present.
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        let mut ids: Vec<WidgetId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for Bridge {
    fn default() -> Bridge {
        Bridge::new()
    }
}
