//! The diff consumer.
//!
//! A [`WidgetDisplay`] owns the consumer-side identity map and applies
//! incoming [`Diff`] batches, in order, against native widgets obtained from
//! a pluggable [`WidgetFactory`]. The native side is reached through two
//! traits: [`Widget`], one constructed native control, and [`Children`], one
//! named ordered list of child widgets on it.
//!
//! Widgets of a kind the factory does not know are kept as placeholders:
//! later operations addressed to them are tolerated and do nothing, so a
//! newer producer keeps working against an older consumer.

use crate::diff::{
    ChildrenDiff, Diff, Event, LayoutModifierElement, PropertyDiff, Tag, WidgetKind,
    ROOT_CHILDREN_TAG,
};
use crate::error::ProtocolError;
use crate::events::EventSink;
use crate::id::WidgetId;
use log::debug;
use std::collections::HashMap;

/// One named, ordered list of child widgets.
///
/// `T` is the native handle type; handles are expected to be cheap to clone
/// (a reference, an index, a pointer wrapper).
pub trait Children<T> {
    /// Inserts `child` so that it ends up at `index`.
    fn insert(&mut self, index: usize, child: T);

    /// Relocates `count` contiguous children as a block, preserving their
    /// relative order. Both indices are positions before the move.
    fn move_range(&mut self, from_index: usize, to_index: usize, count: usize);

    /// Removes `count` contiguous children starting at `index`.
    fn remove(&mut self, index: usize, count: usize);

    /// Removes every child.
    fn clear(&mut self);
}

/// Relocates `items[from_index..from_index + count]` as a block so that it
/// starts at `to_index`, where `to_index` is a position before the move.
pub(crate) fn move_block<T>(items: &mut Vec<T>, from_index: usize, to_index: usize, count: usize) {
    if from_index == to_index || count == 0 {
        return;
    }
    let moved: Vec<T> = items.drain(from_index..from_index + count).collect();
    let dest = if to_index > from_index {
        to_index - count
    } else {
        to_index
    };
    items.splice(dest..dest, moved);
}

/// A ready-made [`Children`] implementation backed by a `Vec`.
#[derive(Debug)]
pub struct VecChildren<T> {
    items: Vec<T>,
}

impl<T> VecChildren<T> {
    pub fn new() -> VecChildren<T> {
        VecChildren { items: Vec::new() }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for VecChildren<T> {
    fn default() -> VecChildren<T> {
        VecChildren::new()
    }
}

impl<T> Children<T> for VecChildren<T> {
    fn insert(&mut self, index: usize, child: T) {
        self.items.insert(index, child);
    }

    fn move_range(&mut self, from_index: usize, to_index: usize, count: usize) {
        move_block(&mut self.items, from_index, to_index, count);
    }

    fn remove(&mut self, index: usize, count: usize) {
        self.items.drain(index..index + count);
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// A consumer-side widget: a native handle plus its named children slots.
pub trait Widget<T> {
    /// The native handle backing this widget.
    fn value(&self) -> &T;

    /// Applies one property change. Unknown property tags must be ignored.
    fn apply_property(&mut self, diff: &PropertyDiff);

    /// Replaces the widget's full layout modifier set. Widgets that have no
    /// use for modifiers may leave this as is.
    fn apply_layout_modifiers(&mut self, elements: &[LayoutModifierElement]) {
        let _ = elements;
    }

    /// Returns the children slot named `tag`, or `None` if this widget does
    /// not expose it. Operations on unknown slots are skipped.
    fn children(&mut self, tag: Tag) -> Option<&mut dyn Children<T>>;
}

/// Creates native widgets from schema widget kinds.
///
/// Resolved once at consumer setup; returning `None` for a kind this
/// consumer's schema predates makes the display keep a placeholder instead
/// of failing.
pub trait WidgetFactory<T> {
    fn create(&mut self, kind: WidgetKind, id: WidgetId) -> Option<Box<dyn Widget<T>>>;
}

struct Entry<T> {
    /// `None` for widgets of a kind the factory did not recognize.
    widget: Option<Box<dyn Widget<T>>>,
    /// Child identifiers per slot, mirroring the producer's bookkeeping so
    /// removals can recycle whole subtrees from the identity map.
    slots: HashMap<Tag, Vec<WidgetId>>,
}

/// Consumer-side protocol state: the identity map and the native tree
/// behind it.
pub struct WidgetDisplay<T> {
    widgets: HashMap<WidgetId, Entry<T>>,
    factory: Box<dyn WidgetFactory<T>>,
    events: Box<dyn EventSink>,
}

impl<T: Clone> WidgetDisplay<T> {
    /// Creates a display whose identity map is seeded with `root`, the
    /// pre-existing container every tree insertion descends from.
    pub fn new(
        root: impl Widget<T> + 'static,
        factory: impl WidgetFactory<T> + 'static,
        events: impl EventSink + 'static,
    ) -> WidgetDisplay<T> {
        let mut widgets = HashMap::new();
        widgets.insert(
            WidgetId::ROOT,
            Entry {
                widget: Some(Box::new(root) as Box<dyn Widget<T>>),
                slots: HashMap::new(),
            },
        );
        WidgetDisplay {
            widgets,
            factory: Box::new(factory),
            events: Box::new(events),
        }
    }

    /// Applies one batch, operation by operation, in producer order.
    ///
    /// Children operations apply first, then layout modifiers, then property
    /// changes. An error means the two sides have desynchronized; the
    /// session should be torn down.
    pub fn apply(&mut self, diff: &Diff) -> Result<(), ProtocolError> {
        for op in &diff.children_diffs {
            self.apply_children_diff(op)?;
        }
        for modifiers in &diff.layout_modifiers {
            self.apply_layout_modifiers(modifiers.id, &modifiers.elements)?;
        }
        for property in &diff.property_diffs {
            self.apply_property_diff(property)?;
        }
        Ok(())
    }

    fn apply_children_diff(&mut self, op: &ChildrenDiff) -> Result<(), ProtocolError> {
        match op {
            ChildrenDiff::Clear => {
                self.clear();
                Ok(())
            }
            ChildrenDiff::Insert {
                id,
                tag,
                child_id,
                kind,
                index,
            } => self.insert(*id, *tag, *child_id, *kind, *index),
            ChildrenDiff::Move {
                id,
                tag,
                from_index,
                to_index,
                count,
            } => self.move_children(*id, *tag, *from_index, *to_index, *count),
            ChildrenDiff::Remove {
                id,
                tag,
                index,
                count,
                removed_ids,
            } => self.remove_children(*id, *tag, *index, *count, removed_ids),
        }
    }

    fn clear(&mut self) {
        if let Some(entry) = self.widgets.get_mut(&WidgetId::ROOT) {
            if let Some(widget) = entry.widget.as_mut() {
                if let Some(slot) = widget.children(ROOT_CHILDREN_TAG) {
                    slot.clear();
                }
            }
            entry.slots.clear();
        }
        self.widgets.retain(|id, _| id.is_root());
    }

    fn insert(
        &mut self,
        id: WidgetId,
        tag: Tag,
        child_id: WidgetId,
        kind: WidgetKind,
        index: usize,
    ) -> Result<(), ProtocolError> {
        if !self.widgets.contains_key(&id) {
            return Err(ProtocolError::UnknownWidget(id));
        }

        let child = self.factory.create(kind, child_id);
        if child.is_none() {
            debug!(
                "widget kind {} is unknown; widget {} kept as a placeholder",
                kind, child_id
            );
        }

        if let Some(child) = &child {
            let value = child.value().clone();
            // attach natively, if the parent has somewhere to put it
            let parent = self.widgets.get_mut(&id).expect("parent checked above");
            match parent.widget.as_mut() {
                Some(widget) => match widget.children(tag) {
                    Some(slot) => slot.insert(index, value),
                    None => debug!(
                        "children tag {} is unknown on widget {}; widget {} not attached",
                        tag, id, child_id
                    ),
                },
                None => debug!(
                    "parent {} is a placeholder; widget {} not attached",
                    id, child_id
                ),
            }
        }

        let parent = self.widgets.get_mut(&id).expect("parent checked above");
        parent
            .slots
            .entry(tag)
            .or_insert_with(Vec::new)
            .insert(index, child_id);
        self.widgets.insert(
            child_id,
            Entry {
                widget: child,
                slots: HashMap::new(),
            },
        );
        Ok(())
    }

    fn move_children(
        &mut self,
        id: WidgetId,
        tag: Tag,
        from_index: usize,
        to_index: usize,
        count: usize,
    ) -> Result<(), ProtocolError> {
        let entry = match self.widgets.get_mut(&id) {
            Some(entry) => entry,
            None => return Err(ProtocolError::UnknownWidget(id)),
        };
        if let Some(widget) = entry.widget.as_mut() {
            if let Some(slot) = widget.children(tag) {
                slot.move_range(from_index, to_index, count);
            }
        }
        if let Some(ids) = entry.slots.get_mut(&tag) {
            move_block(ids, from_index, to_index, count);
        }
        Ok(())
    }

    fn remove_children(
        &mut self,
        id: WidgetId,
        tag: Tag,
        index: usize,
        count: usize,
        removed_ids: &[WidgetId],
    ) -> Result<(), ProtocolError> {
        debug_assert_eq!(removed_ids.len(), count, "malformed remove operation");
        if !self.widgets.contains_key(&id) {
            return Err(ProtocolError::UnknownWidget(id));
        }
        // validate before mutating anything, so a desync surfaces as an
        // error rather than a half-applied operation
        for &removed in removed_ids {
            if !self.widgets.contains_key(&removed) {
                return Err(ProtocolError::UnknownWidget(removed));
            }
        }

        let entry = self.widgets.get_mut(&id).expect("parent checked above");
        if let Some(widget) = entry.widget.as_mut() {
            if let Some(slot) = widget.children(tag) {
                slot.remove(index, count);
            }
        }
        if let Some(ids) = entry.slots.get_mut(&tag) {
            ids.drain(index..index + count);
        }
        for &removed in removed_ids {
            self.remove_tree(removed);
        }
        Ok(())
    }

    /// Recycles `id` and every descendant recorded in its slot bookkeeping.
    fn remove_tree(&mut self, id: WidgetId) {
        if let Some(entry) = self.widgets.remove(&id) {
            for (_, slot) in entry.slots {
                for child in slot {
                    self.remove_tree(child);
                }
            }
        }
    }

    fn apply_layout_modifiers(
        &mut self,
        id: WidgetId,
        elements: &[LayoutModifierElement],
    ) -> Result<(), ProtocolError> {
        let entry = match self.widgets.get_mut(&id) {
            Some(entry) => entry,
            None => return Err(ProtocolError::UnknownWidget(id)),
        };
        match entry.widget.as_mut() {
            Some(widget) => widget.apply_layout_modifiers(elements),
            None => debug!("layout modifiers for placeholder widget {} ignored", id),
        }
        Ok(())
    }

    fn apply_property_diff(&mut self, diff: &PropertyDiff) -> Result<(), ProtocolError> {
        let entry = match self.widgets.get_mut(&diff.id) {
            Some(entry) => entry,
            None => return Err(ProtocolError::UnknownWidget(diff.id)),
        };
        match entry.widget.as_mut() {
            Some(widget) => widget.apply_property(diff),
            None => debug!(
                "property tag {} for placeholder widget {} ignored",
                diff.tag, diff.id
            ),
        }
        Ok(())
    }

    /// Routes a native interaction out to the producer.
    ///
    /// Events for widgets no longer in the identity map are dropped: the
    /// native side may fire an interaction after the widget's removal has
    /// already been applied.
    pub fn dispatch_event(&self, event: Event) {
        if self.widgets.contains_key(&event.id) {
            self.events.send_event(event);
        } else {
            debug!(
                "dropping event with tag {} for removed widget {}",
                event.tag, event.id
            );
        }
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(&id)
    }

    /// All currently registered identifiers, in ascending order. The root is
    /// always present.
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        let mut ids: Vec<WidgetId> = self.widgets.keys().copied().collect();
        ids.sort();
        ids
    }
}
