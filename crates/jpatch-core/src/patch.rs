//! RFC 6902 operations and the application engine.
//!
//! Operations execute strictly in order. The engine stops at the first failure
//! and wraps it in [`PatchError::Operation`] with the position and kind of the
//! offending operation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::pointer::{self, Pointer, APPEND_TOKEN};
use crate::{Node, PatchError};

/// The six operation tags of RFC 6902.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// `add`
    Add,
    /// `remove`
    Remove,
    /// `replace`
    Replace,
    /// `move`
    Move,
    /// `copy`
    Copy,
    /// `test`
    Test,
}

impl OperationKind {
    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = PatchError;

    /// ```
    /// # use jpatch_core::{OperationKind, PatchError};
    /// assert_eq!("move".parse::<OperationKind>()?, OperationKind::Move);
    /// assert!(matches!(
    ///     "merge".parse::<OperationKind>(),
    ///     Err(PatchError::UnsupportedOperationKind { .. })
    /// ));
    /// # Ok::<(), PatchError>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "test" => Ok(Self::Test),
            other => Err(PatchError::UnsupportedOperationKind { op: other.to_string() }),
        }
    }
}

/// A single patch operation.
///
/// Paths are kept as pointer text and parsed when the operation executes, so a
/// patch with a malformed pointer still decodes and fails at its position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperation", into = "RawOperation")]
pub enum Operation {
    /// Insert into an array, set an object member or replace the root.
    Add {
        /// Destination pointer.
        path: String,
        /// Value to add.
        value: Node,
    },
    /// Delete an existing member or element.
    Remove {
        /// Target pointer.
        path: String,
    },
    /// Overwrite an existing location.
    Replace {
        /// Target pointer.
        path: String,
        /// New value.
        value: Node,
    },
    /// Remove a value and add it elsewhere.
    Move {
        /// Source pointer.
        from: String,
        /// Destination pointer.
        path: String,
    },
    /// Set a copy of a value elsewhere.
    Copy {
        /// Source pointer.
        from: String,
        /// Destination pointer.
        path: String,
    },
    /// Assert that a location holds a value.
    Test {
        /// Target pointer.
        path: String,
        /// Expected value.
        value: Node,
    },
}

impl Operation {
    /// Builds an `add` operation.
    pub fn add(path: impl Into<String>, value: impl Into<Node>) -> Self {
        Self::Add { path: path.into(), value: value.into() }
    }

    /// Builds a `remove` operation.
    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    /// Builds a `replace` operation.
    pub fn replace(path: impl Into<String>, value: impl Into<Node>) -> Self {
        Self::Replace { path: path.into(), value: value.into() }
    }

    /// Builds a `move` operation.
    pub fn move_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Move { from: from.into(), path: path.into() }
    }

    /// Builds a `copy` operation.
    pub fn copy_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Copy { from: from.into(), path: path.into() }
    }

    /// Builds a `test` operation.
    pub fn test(path: impl Into<String>, value: impl Into<Node>) -> Self {
        Self::Test { path: path.into(), value: value.into() }
    }

    /// Returns the operation tag.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Add { .. } => OperationKind::Add,
            Self::Remove { .. } => OperationKind::Remove,
            Self::Replace { .. } => OperationKind::Replace,
            Self::Move { .. } => OperationKind::Move,
            Self::Copy { .. } => OperationKind::Copy,
            Self::Test { .. } => OperationKind::Test,
        }
    }

    /// Returns the target pointer text.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }

    /// Returns the source pointer text of `move` and `copy`.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        match self {
            Self::Move { from, .. } | Self::Copy { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Returns the value carried by `add`, `replace` and `test`.
    #[must_use]
    pub fn value(&self) -> Option<&Node> {
        match self {
            Self::Add { value, .. } | Self::Replace { value, .. } | Self::Test { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawOperation {
    #[serde(default)]
    op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<Node>,
}

// Only called when the field is present, so `null` becomes `Some(Node::Null)`.
pub(crate) fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    Node::deserialize(deserializer).map(Some)
}

impl TryFrom<RawOperation> for Operation {
    type Error = PatchError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let Some(tag) = raw.op else {
            return Err(PatchError::InvalidPatch { reason: "record is missing `op`".to_string() });
        };
        let kind: OperationKind = tag.parse()?;
        let missing = |field| PatchError::MissingField { op: kind, field };
        let path = raw.path.ok_or_else(|| missing("path"))?;
        Ok(match kind {
            OperationKind::Add => {
                Self::Add { path, value: raw.value.ok_or_else(|| missing("value"))? }
            }
            OperationKind::Remove => Self::Remove { path },
            OperationKind::Replace => {
                Self::Replace { path, value: raw.value.ok_or_else(|| missing("value"))? }
            }
            OperationKind::Move => {
                Self::Move { from: raw.from.ok_or_else(|| missing("from"))?, path }
            }
            OperationKind::Copy => {
                Self::Copy { from: raw.from.ok_or_else(|| missing("from"))?, path }
            }
            OperationKind::Test => {
                Self::Test { path, value: raw.value.ok_or_else(|| missing("value"))? }
            }
        })
    }
}

impl From<Operation> for RawOperation {
    fn from(operation: Operation) -> Self {
        let op = Some(operation.kind().as_str().to_string());
        match operation {
            Operation::Add { path, value }
            | Operation::Replace { path, value }
            | Operation::Test { path, value } => {
                Self { op, from: None, path: Some(path), value: Some(value) }
            }
            Operation::Remove { path } => Self { op, from: None, path: Some(path), value: None },
            Operation::Move { from, path } | Operation::Copy { from, path } => {
                Self { op, from: Some(from), path: Some(path), value: None }
            }
        }
    }
}

/// An ordered list of operations.
///
/// ```
/// # use jpatch_core::{Operation, Patch};
/// let patch = Patch::from_json_str(
///     r#"[{"op":"add","path":"/a","value":null},{"op":"move","from":"/a","path":"/b"}]"#,
/// )?;
/// assert_eq!(patch.len(), 2);
/// assert_eq!(patch.operations()[0], Operation::add("/a", jpatch_core::Node::Null));
/// assert_eq!(
///     patch.to_json_string(),
///     r#"[{"op":"add","path":"/a","value":null},{"op":"move","from":"/a","path":"/b"}]"#,
/// );
/// # Ok::<(), jpatch_core::PatchError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Vec<Operation>);

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a patch from JSON text.
    pub fn from_json_str(input: &str) -> Result<Self, PatchError> {
        let value: JsonValue = serde_json::from_str(input)
            .map_err(|err| PatchError::InvalidPatch { reason: err.to_string() })?;
        Self::from_json_value(value)
    }

    /// Decodes a patch from a JSON value.
    ///
    /// Record-level failures name the position of the offending record.
    ///
    /// ```
    /// # use jpatch_core::{Patch, PatchError};
    /// let value = serde_json::json!([
    ///     {"op": "remove", "path": "/a"},
    ///     {"op": "copy", "path": "/b"},
    /// ]);
    /// let err = Patch::from_json_value(value).unwrap_err();
    /// assert_eq!(err.operation_index(), Some(1));
    /// assert!(matches!(err.root_cause(), PatchError::MissingField { field: "from", .. }));
    /// ```
    pub fn from_json_value(value: JsonValue) -> Result<Self, PatchError> {
        let JsonValue::Array(records) = value else {
            return Err(PatchError::InvalidPatch {
                reason: "expected an array of operation records".to_string(),
            });
        };
        let mut operations = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let raw: RawOperation = serde_json::from_value(record).map_err(|err| {
                PatchError::InvalidPatch { reason: format!("record {index}: {err}") }
            })?;
            let operation = Operation::try_from(raw).map_err(|err| match &err {
                PatchError::MissingField { op, .. } => {
                    let op = *op;
                    err.at_operation(index, op)
                }
                _ => err,
            })?;
            operations.push(operation);
        }
        Ok(Self(operations))
    }

    /// Encodes the patch as compact RFC 6902 JSON.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        // Every map key is a string, so serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the operations in order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether the patch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends an operation.
    pub fn push(&mut self, operation: Operation) {
        self.0.push(operation);
    }
}

impl From<Vec<Operation>> for Patch {
    fn from(operations: Vec<Operation>) -> Self {
        Self(operations)
    }
}

impl FromIterator<Operation> for Patch {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Patch {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub(crate) fn apply(document: &Node, patch: &Patch) -> Result<Node, PatchError> {
    let mut working = document.clone();
    apply_in_place(&mut working, patch)?;
    Ok(working)
}

pub(crate) fn apply_in_place(document: &mut Node, patch: &Patch) -> Result<(), PatchError> {
    for (index, operation) in patch.iter().enumerate() {
        debug!(index, op = %operation.kind(), path = operation.path(), "applying operation");
        apply_operation(document, operation)
            .map_err(|err| err.at_operation(index, operation.kind()))?;
    }
    Ok(())
}

/// Executes one operation against `document`.
pub(crate) fn apply_operation(
    document: &mut Node,
    operation: &Operation,
) -> Result<(), PatchError> {
    match operation {
        Operation::Add { path, value } => add(document, &Pointer::parse(path)?, value.clone()),
        Operation::Remove { path } => pointer::remove(document, &Pointer::parse(path)?).map(drop),
        Operation::Replace { path, value } => {
            let path = Pointer::parse(path)?;
            pointer::get(document, &path)?;
            pointer::set(document, &path, value.clone())
        }
        Operation::Move { from, path } => {
            let from = Pointer::parse(from)?;
            let path = Pointer::parse(path)?;
            let value = take(document, &from, OperationKind::Move)?;
            add(document, &path, value)
        }
        Operation::Copy { from, path } => {
            let value = pointer::get(document, &Pointer::parse(from)?)?.clone();
            pointer::set(document, &Pointer::parse(path)?, value)
        }
        Operation::Test { path, value } => test(document, &Pointer::parse(path)?, value),
    }
}

/// Adds `value` at `path` with insert semantics for arrays.
pub(crate) fn add(document: &mut Node, path: &Pointer, value: Node) -> Result<(), PatchError> {
    let Some((parent, token)) = path.split_last() else {
        *document = value;
        return Ok(());
    };
    match pointer::get_mut(document, &parent)? {
        Node::Array(items) => {
            let len = items.len();
            let idx = pointer::array_slot(path, token, len)?;
            if idx > len {
                return Err(PatchError::ArrayIndexOutOfRange {
                    path: path.to_string(),
                    index: idx,
                    len,
                });
            }
            Arc::make_mut(items).insert(idx, value);
            Ok(())
        }
        Node::Object(map) => {
            Arc::make_mut(map).insert(token.to_string(), value);
            Ok(())
        }
        other => {
            Err(PatchError::ParentNotContainer { path: path.to_string(), found: other.kind() })
        }
    }
}

/// Removes and returns the value at `from`, rejecting the root.
pub(crate) fn take(
    document: &mut Node,
    from: &Pointer,
    op: OperationKind,
) -> Result<Node, PatchError> {
    if from.is_root() {
        return Err(PatchError::RootOperationUnsupported { op });
    }
    pointer::remove(document, from)
}

pub(crate) fn test(document: &Node, path: &Pointer, expected: &Node) -> Result<(), PatchError> {
    let actual = pointer::get(document, path)?;
    if actual == expected {
        return Ok(());
    }
    Err(PatchError::TestMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Replaces a trailing append marker with the concrete index it denotes.
///
/// Pointers whose parent is not an array are returned unchanged.
pub(crate) fn resolve_append(document: &Node, path: &Pointer) -> Result<Pointer, PatchError> {
    let Some((parent, token)) = path.split_last() else {
        return Ok(path.clone());
    };
    if token != APPEND_TOKEN {
        return Ok(path.clone());
    }
    match pointer::get(document, &parent)? {
        Node::Array(items) => Ok(parent.child(items.len().to_string())),
        _ => Ok(path.clone()),
    }
}
