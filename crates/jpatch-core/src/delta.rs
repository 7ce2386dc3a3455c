//! Invertible delta records.
//!
//! [`Diff::prepare`] simulates a patch on a private copy of the document and
//! records, for every state change it performs, what the location held before
//! and after. The deltas compile into a `forward` patch that replays the
//! change with concrete paths and a `reverse` patch that undoes it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patch::{self, deserialize_present};
use crate::pointer::{self, parse_array_index, Pointer};
use crate::{Node, Operation, OperationKind, Patch, PatchError};

/// The state change recorded by a [`Delta`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    /// A value was added (inserted into an array, or set on an object or the root).
    Add,
    /// A value was removed.
    Remove,
    /// An existing value was overwritten in place.
    Replace,
}

/// One recorded state change at a concrete path.
///
/// The path never ends in the append marker when its parent is an array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Resolved location of the change.
    pub path: Pointer,
    /// Kind of change.
    pub op: DeltaKind,
    /// Value held before the change, when there was one.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub before: Option<Node>,
    /// Value held after the change, when there is one.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub after: Option<Node>,
    /// Whether the location was occupied before the change.
    pub existed_before: bool,
    /// Whether the location is occupied after the change.
    pub existed_after: bool,
}

impl Delta {
    fn added(path: Pointer, before: Option<Node>, after: Node) -> Self {
        Self {
            path,
            op: DeltaKind::Add,
            existed_before: before.is_some(),
            before,
            after: Some(after),
            existed_after: true,
        }
    }

    fn removed(path: Pointer, before: Node) -> Self {
        Self {
            path,
            op: DeltaKind::Remove,
            before: Some(before),
            after: None,
            existed_before: true,
            existed_after: false,
        }
    }

    fn replaced(path: Pointer, before: Node, after: Node) -> Self {
        Self {
            path,
            op: DeltaKind::Replace,
            before: Some(before),
            after: Some(after),
            existed_before: true,
            existed_after: true,
        }
    }

    fn forward(&self) -> Option<Operation> {
        let path = self.path.to_string();
        Some(match self.op {
            DeltaKind::Add => Operation::add(path, self.after.clone()?),
            DeltaKind::Remove => Operation::remove(path),
            DeltaKind::Replace => Operation::replace(path, self.after.clone()?),
        })
    }

    fn reverse(&self) -> Option<Operation> {
        let path = self.path.to_string();
        if self.path.is_root() {
            return Some(Operation::replace(path, self.before.clone()?));
        }
        Some(match self.op {
            DeltaKind::Add if self.existed_before => Operation::replace(path, self.before.clone()?),
            DeltaKind::Add => Operation::remove(path),
            DeltaKind::Remove => Operation::add(path, self.before.clone()?),
            DeltaKind::Replace => Operation::replace(path, self.before.clone()?),
        })
    }
}

/// A reusable, invertible record of what a patch did to one document.
///
/// ```
/// # use jpatch_core::{Diff, Node, Patch};
/// let original = Node::from_json_str(r#"{"items":["a","b"]}"#)?;
/// let patch = Patch::from_json_str(r#"[{"op":"add","path":"/items/-","value":"c"}]"#)?;
/// let diff = Diff::prepare(&original, &patch)?;
/// assert_eq!(diff.forward().to_json_string(), r#"[{"op":"add","path":"/items/2","value":"c"}]"#);
/// assert_eq!(diff.reverse().to_json_string(), r#"[{"op":"remove","path":"/items/2"}]"#);
///
/// let patched = diff.apply(&original)?;
/// assert_eq!(patched, original.apply_patch(&patch)?);
/// assert_eq!(diff.revert(&patched)?, original);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiffRecord", into = "DiffRecord")]
pub struct Diff {
    deltas: Vec<Delta>,
    forward: Patch,
    reverse: Patch,
}

#[derive(Serialize, Deserialize)]
struct DiffRecord {
    deltas: Vec<Delta>,
}

impl TryFrom<DiffRecord> for Diff {
    type Error = PatchError;

    fn try_from(record: DiffRecord) -> Result<Self, Self::Error> {
        Self::from_deltas(record.deltas)
    }
}

impl From<Diff> for DiffRecord {
    fn from(diff: Diff) -> Self {
        Self { deltas: diff.deltas }
    }
}

impl Diff {
    /// Simulates `patch` against `original` and records its effect.
    ///
    /// Fails with the same errors as [`Node::apply_patch`]; a failing `test`
    /// aborts preparation and no partial record is returned.
    pub fn prepare(original: &Node, patch: &Patch) -> Result<Self, PatchError> {
        let mut working = original.clone();
        let mut deltas = Vec::with_capacity(patch.len());
        for (index, operation) in patch.iter().enumerate() {
            debug!(index, op = %operation.kind(), path = operation.path(), "recording operation");
            record(&mut working, operation, &mut deltas)
                .map_err(|err| err.at_operation(index, operation.kind()))?;
        }
        debug!(operations = patch.len(), deltas = deltas.len(), "prepared delta record");
        Self::from_deltas(deltas)
    }

    /// Compiles forward and reverse patches from explicit deltas.
    ///
    /// Rejects deltas lacking the values their kind needs to be replayed or
    /// undone.
    pub fn from_deltas(deltas: Vec<Delta>) -> Result<Self, PatchError> {
        let mut forward = Patch::new();
        for (index, delta) in deltas.iter().enumerate() {
            forward.push(delta.forward().ok_or_else(|| incomplete(index, "after"))?);
        }
        let mut reverse = Patch::new();
        for (index, delta) in deltas.iter().enumerate().rev() {
            reverse.push(delta.reverse().ok_or_else(|| incomplete(index, "before"))?);
        }
        Ok(Self { deltas, forward, reverse })
    }

    /// Recorded deltas in execution order.
    #[must_use]
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Patch reproducing the recorded effect.
    #[must_use]
    pub fn forward(&self) -> &Patch {
        &self.forward
    }

    /// Patch undoing the recorded effect.
    #[must_use]
    pub fn reverse(&self) -> &Patch {
        &self.reverse
    }

    /// Indicates whether the patch changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Replays the forward patch on a copy of `document`.
    pub fn apply(&self, document: &Node) -> Result<Node, PatchError> {
        patch::apply(document, &self.forward)
    }

    /// Replays the forward patch on `document` itself.
    pub fn apply_in_place(&self, document: &mut Node) -> Result<(), PatchError> {
        patch::apply_in_place(document, &self.forward)
    }

    /// Applies the reverse patch to a copy of `document`.
    pub fn revert(&self, document: &Node) -> Result<Node, PatchError> {
        patch::apply(document, &self.reverse)
    }

    /// Applies the reverse patch to `document` itself.
    pub fn revert_in_place(&self, document: &mut Node) -> Result<(), PatchError> {
        patch::apply_in_place(document, &self.reverse)
    }
}

fn incomplete(index: usize, field: &str) -> PatchError {
    PatchError::InvalidPatch { reason: format!("delta {index} has no `{field}` value") }
}

/// What currently sits at a concrete location.
struct Occupant {
    value: Option<Node>,
    in_array: bool,
}

fn occupant(document: &Node, path: &Pointer) -> Result<Occupant, PatchError> {
    let Some((parent, token)) = path.split_last() else {
        return Ok(Occupant { value: Some(document.clone()), in_array: false });
    };
    Ok(match pointer::get(document, &parent)? {
        Node::Object(map) => Occupant { value: map.get(token).cloned(), in_array: false },
        Node::Array(items) => Occupant {
            value: parse_array_index(token).and_then(|idx| items.get(idx)).cloned(),
            in_array: true,
        },
        _ => Occupant { value: None, in_array: false },
    })
}

fn record(
    working: &mut Node,
    operation: &Operation,
    deltas: &mut Vec<Delta>,
) -> Result<(), PatchError> {
    match operation {
        Operation::Add { path, value } => {
            let path = patch::resolve_append(working, &Pointer::parse(path)?)?;
            insert(working, path, value.clone(), deltas)
        }
        Operation::Remove { path } => {
            let path = Pointer::parse(path)?;
            let removed = pointer::remove(working, &path)?;
            deltas.push(Delta::removed(path, removed));
            Ok(())
        }
        Operation::Replace { path, value } => {
            let path = Pointer::parse(path)?;
            let before = pointer::get(working, &path)?.clone();
            pointer::set(working, &path, value.clone())?;
            deltas.push(Delta::replaced(path, before, value.clone()));
            Ok(())
        }
        Operation::Move { from, path } => {
            let from = Pointer::parse(from)?;
            let path = Pointer::parse(path)?;
            let value = patch::take(working, &from, OperationKind::Move)?;
            deltas.push(Delta::removed(from, value.clone()));
            let path = patch::resolve_append(working, &path)?;
            insert(working, path, value, deltas)
        }
        Operation::Copy { from, path } => {
            let value = pointer::get(working, &Pointer::parse(from)?)?.clone();
            let path = patch::resolve_append(working, &Pointer::parse(path)?)?;
            let Occupant { value: before, in_array } = occupant(working, &path)?;
            pointer::set(working, &path, value.clone())?;
            deltas.push(match before {
                Some(before) if in_array => Delta::replaced(path, before, value),
                before => Delta::added(path, before, value),
            });
            Ok(())
        }
        Operation::Test { path, value } => patch::test(working, &Pointer::parse(path)?, value),
    }
}

/// Adds with insert semantics and records the delta.
///
/// Array inserts shift rather than overwrite, so they never count as
/// pre-existing.
fn insert(
    working: &mut Node,
    path: Pointer,
    value: Node,
    deltas: &mut Vec<Delta>,
) -> Result<(), PatchError> {
    let Occupant { value: before, in_array } = occupant(working, &path)?;
    patch::add(working, &path, value.clone())?;
    let before = if in_array { None } else { before };
    deltas.push(Delta::added(path, before, value));
    Ok(())
}
