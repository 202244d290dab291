//! The wire vocabulary: diff batches and events.
//!
//! One [`Diff`] batch carries everything one update cycle changed, in the
//! order the mutations occurred. The consumer applies children operations
//! first, then layout modifiers, then property changes; within each sequence
//! the order is significant, since later operations may address identifiers
//! or indices that only exist after earlier ones executed.
//!
//! Everything here is plain serializable data. Schema tags are opaque small
//! integers; property values and layout modifier payloads are opaque JSON.

use crate::error::DiffError;
use crate::id::WidgetId;
use core::fmt;
use serde::de::{self, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema-defined tag naming a property slot, a children slot, or an event
/// slot on a widget kind.
pub type Tag = u32;

/// A schema-defined tag naming a widget kind.
pub type WidgetKind = u32;

/// The tag of the root container's single children slot.
pub const ROOT_CHILDREN_TAG: Tag = 0;

/// An operation on one children slot of one parent widget.
///
/// Serializes as a two-element array `["kind", {payload}]` so that either
/// side can skip payloads it does not understand without a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildrenDiff {
    /// Drops the entire tree. Only the root survives.
    Clear,
    /// Inserts the widget `child_id` of kind `kind` into the slot `tag` of
    /// widget `id`. `index` is the child's position after insertion.
    Insert {
        id: WidgetId,
        tag: Tag,
        child_id: WidgetId,
        kind: WidgetKind,
        index: usize,
    },
    /// Relocates `count` contiguous children as a block, preserving their
    /// relative order. Both indices are positions before the move; a
    /// self-move (`from_index == to_index`) is legal and a no-op.
    Move {
        id: WidgetId,
        tag: Tag,
        from_index: usize,
        to_index: usize,
        count: usize,
    },
    /// Removes `count` contiguous children starting at `index`.
    /// `removed_ids` enumerates the removed identifiers in order, so the
    /// consumer can recycle its identity map entries.
    Remove {
        id: WidgetId,
        tag: Tag,
        index: usize,
        count: usize,
        removed_ids: Vec<WidgetId>,
    },
}

impl ChildrenDiff {
    /// Creates a `Remove`, validating that `removed_ids` enumerates exactly
    /// `count` identifiers. The mismatch is a construction-time error; it
    /// never travels over the wire.
    pub fn remove(
        id: WidgetId,
        tag: Tag,
        index: usize,
        count: usize,
        removed_ids: Vec<WidgetId>,
    ) -> Result<ChildrenDiff, DiffError> {
        if removed_ids.len() != count {
            return Err(DiffError::RemovedIdsMismatch {
                count,
                ids: removed_ids.len(),
            });
        }
        Ok(ChildrenDiff::Remove {
            id,
            tag,
            index,
            count,
            removed_ids,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ClearPayload {}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertPayload {
    id: WidgetId,
    tag: Tag,
    child_id: WidgetId,
    kind: WidgetKind,
    index: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovePayload {
    id: WidgetId,
    tag: Tag,
    from_index: usize,
    to_index: usize,
    count: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemovePayload {
    id: WidgetId,
    tag: Tag,
    index: usize,
    count: usize,
    removed_ids: Vec<WidgetId>,
}

impl Serialize for ChildrenDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        match self {
            ChildrenDiff::Clear => {
                tuple.serialize_element("clear")?;
                tuple.serialize_element(&ClearPayload {})?;
            }
            ChildrenDiff::Insert {
                id,
                tag,
                child_id,
                kind,
                index,
            } => {
                tuple.serialize_element("insert")?;
                tuple.serialize_element(&InsertPayload {
                    id: *id,
                    tag: *tag,
                    child_id: *child_id,
                    kind: *kind,
                    index: *index,
                })?;
            }
            ChildrenDiff::Move {
                id,
                tag,
                from_index,
                to_index,
                count,
            } => {
                tuple.serialize_element("move")?;
                tuple.serialize_element(&MovePayload {
                    id: *id,
                    tag: *tag,
                    from_index: *from_index,
                    to_index: *to_index,
                    count: *count,
                })?;
            }
            ChildrenDiff::Remove {
                id,
                tag,
                index,
                count,
                removed_ids,
            } => {
                tuple.serialize_element("remove")?;
                tuple.serialize_element(&RemovePayload {
                    id: *id,
                    tag: *tag,
                    index: *index,
                    count: *count,
                    removed_ids: removed_ids.clone(),
                })?;
            }
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for ChildrenDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ChildrenDiff, D::Error> {
        struct ChildrenDiffVisitor;

        impl<'de> Visitor<'de> for ChildrenDiffVisitor {
            type Value = ChildrenDiff;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [\"kind\", payload] children operation")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ChildrenDiff, A::Error> {
                let kind: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let diff = match kind.as_str() {
                    "clear" => {
                        let _: Option<IgnoredAny> = seq.next_element()?;
                        ChildrenDiff::Clear
                    }
                    "insert" => {
                        let p: InsertPayload = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                        ChildrenDiff::Insert {
                            id: p.id,
                            tag: p.tag,
                            child_id: p.child_id,
                            kind: p.kind,
                            index: p.index,
                        }
                    }
                    "move" => {
                        let p: MovePayload = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                        ChildrenDiff::Move {
                            id: p.id,
                            tag: p.tag,
                            from_index: p.from_index,
                            to_index: p.to_index,
                            count: p.count,
                        }
                    }
                    "remove" => {
                        let p: RemovePayload = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                        ChildrenDiff::remove(p.id, p.tag, p.index, p.count, p.removed_ids)
                            .map_err(de::Error::custom)?
                    }
                    other => {
                        return Err(de::Error::unknown_variant(
                            other,
                            &["clear", "insert", "move", "remove"],
                        ));
                    }
                };
                Ok(diff)
            }
        }

        deserializer.deserialize_seq(ChildrenDiffVisitor)
    }
}

/// One property change on one widget.
///
/// A property not mentioned in a batch is unchanged. A mentioned property
/// with no `value` is reset to its schema default; an explicit JSON `null`
/// is a value like any other, distinct from absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDiff {
    pub id: WidgetId,
    pub tag: Tag,
    #[serde(
        default,
        deserialize_with = "some_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl PropertyDiff {
    pub fn new(id: WidgetId, tag: Tag, value: Option<Value>) -> PropertyDiff {
        PropertyDiff { id, tag, value }
    }
}

/// One opaque typed element of a widget's layout modifier set.
///
/// Serializes as `[tag, payload]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutModifierElement(pub Tag, pub Value);

/// Replaces, in full, the layout modifier set attached to one widget.
/// Applying this is a replace, never a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutModifiers {
    pub id: WidgetId,
    pub elements: Vec<LayoutModifierElement>,
}

/// A user interaction notification, flowing consumer to producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The widget the interaction happened on.
    pub id: WidgetId,
    /// Which event slot fired.
    pub tag: Tag,
    #[serde(
        default,
        deserialize_with = "some_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl Event {
    pub fn new(id: WidgetId, tag: Tag, value: Option<Value>) -> Event {
        Event { id, tag, value }
    }
}

/// Maps a present `null` to `Some(Value::Null)` instead of `None`, so that
/// an explicit null round-trips distinct from key absence.
fn some_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Everything one update cycle changed, as one atomic batch.
///
/// An empty batch is valid, serializes to `{}`, and is a no-op when applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_diffs: Vec<ChildrenDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layout_modifiers: Vec<LayoutModifiers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_diffs: Vec<PropertyDiff>,
}

impl Diff {
    pub fn new() -> Diff {
        Diff::default()
    }

    pub fn is_empty(&self) -> bool {
        self.children_diffs.is_empty()
            && self.layout_modifiers.is_empty()
            && self.property_diffs.is_empty()
    }
}
