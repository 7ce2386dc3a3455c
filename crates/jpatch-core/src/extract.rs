//! Added-content extraction.
//!
//! Splits a patched document into the content introduced by the patch's `add`
//! operations and everything else. Only containers on a write path are copied;
//! every other subtree, leaves included, stays shared with the input.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::node::ObjectMap;
use crate::pointer::{self, parse_array_index, Pointer, APPEND_TOKEN};
use crate::{Node, Operation, OperationKind, Patch, PatchError};

/// Result of [`extract_added`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Extraction {
    /// The document with every added member and element taken out.
    pub remaining: Node,
    /// Only the added content, laid out at the paths it was added to.
    ///
    /// `None` when the patch has no `add` operation.
    pub added: Option<Node>,
}

/// Partitions `after` by the `add` operations of `patch`.
///
/// `after` is expected to be the document the patch produced. Other operation
/// kinds are ignored, and `after` itself is never modified.
///
/// ```
/// # use jpatch_core::{extract_added, Node, Patch};
/// let after = Node::from_json_str(r#"{"tags":["a","b","c"],"meta":{"x":1}}"#)?;
/// let patch = Patch::from_json_str(r#"[{"op":"add","path":"/tags/-","value":"c"}]"#)?;
/// let split = extract_added(&after, &patch)?;
/// assert_eq!(split.remaining, Node::from_json_str(r#"{"tags":["a","b"],"meta":{"x":1}}"#)?);
/// assert_eq!(split.added, Some(Node::from_json_str(r#"{"tags":["c"]}"#)?));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// Fails when an `add` targets the root or carries a malformed pointer, when
/// a targeted parent is missing or is a scalar, when an object parent receives
/// an index or `-` token, and when an array index does not refer to a
/// position that existed before the patch. Errors are tagged with the
/// position of the offending `add`; a failure that concerns a whole parent is
/// tagged with the first `add` targeting it.
pub fn extract_added(after: &Node, patch: &Patch) -> Result<Extraction, PatchError> {
    let mut groups: BTreeMap<(usize, Pointer), Vec<Added>> = BTreeMap::new();
    for (index, operation) in patch.iter().enumerate() {
        let Operation::Add { path, .. } = operation else {
            continue;
        };
        let pointer =
            Pointer::parse(path).map_err(|err| err.at_operation(index, OperationKind::Add))?;
        let Some((parent, token)) = pointer.split_last() else {
            return Err(PatchError::RootOperationUnsupported { op: OperationKind::Add }
                .at_operation(index, OperationKind::Add));
        };
        let token = token.to_string();
        groups.entry((parent.len(), parent)).or_default().push(Added { index, token });
    }

    if groups.is_empty() {
        return Ok(Extraction { remaining: after.clone(), added: None });
    }

    let mut extractor = Extractor {
        remaining: after.clone(),
        added: None,
        extracted: Vec::new(),
    };
    for ((_, parent), children) in groups {
        if extractor.extracted.iter().any(|done| parent.starts_with(done)) {
            debug!(parent = %parent, "skipping adds inside extracted content");
            continue;
        }
        let first = children[0].index;
        extractor.take_group(after, &parent, &children).map_err(|err| match err {
            tagged @ PatchError::Operation { .. } => tagged,
            other => other.at_operation(first, OperationKind::Add),
        })?;
    }
    debug!(extracted = extractor.extracted.len(), "extracted added content");
    Ok(Extraction { remaining: extractor.remaining, added: extractor.added })
}

/// One `add` targeting a parent: its position in the patch and its final token.
struct Added {
    index: usize,
    token: String,
}

struct Extractor {
    remaining: Node,
    added: Option<Node>,
    /// Locations whose whole subtree already moved to `added`.
    extracted: Vec<Pointer>,
}

impl Extractor {
    fn take_group(
        &mut self,
        after: &Node,
        parent: &Pointer,
        children: &[Added],
    ) -> Result<(), PatchError> {
        match pointer::get(after, parent)? {
            Node::Object(members) => self.take_members(parent, members, children),
            Node::Array(items) => self.take_elements(parent, items, children),
            other => Err(PatchError::type_mismatch(
                parent.to_string(),
                format!("added content needs an object or array parent, found {}", other.kind()),
            )),
        }
    }

    fn take_members(
        &mut self,
        parent: &Pointer,
        members: &ObjectMap,
        children: &[Added],
    ) -> Result<(), PatchError> {
        let mut keys = BTreeSet::new();
        for child in children {
            let key = child.token.as_str();
            if key == APPEND_TOKEN || parse_array_index(key).is_some() {
                return Err(PatchError::type_mismatch(
                    parent.child(key).to_string(),
                    "object parent received an array-style token",
                )
                .at_operation(child.index, OperationKind::Add));
            }
            keys.insert(key);
        }

        let taken = keys
            .iter()
            // A key the patch added and later removed again has no live value.
            .map(|&key| (key.to_string(), members.get(key).cloned().unwrap_or(Node::Null)))
            .collect();
        self.place(parent, Node::object(taken))?;

        let target = pointer::get_mut(&mut self.remaining, parent)?;
        let Node::Object(map) = target else {
            return Err(PatchError::type_mismatch(parent.to_string(), "expected an object"));
        };
        let map = Arc::make_mut(map);
        for key in keys {
            map.remove(key);
            self.extracted.push(parent.child(key));
        }
        Ok(())
    }

    fn take_elements(
        &mut self,
        parent: &Pointer,
        items: &[Node],
        children: &[Added],
    ) -> Result<(), PatchError> {
        let len = items.len();
        let base_len = len.checked_sub(children.len()).ok_or_else(|| {
            PatchError::type_mismatch(
                parent.to_string(),
                format!("array of length {len} cannot hold {} added elements", children.len()),
            )
        })?;

        let mut resolved = BTreeSet::new();
        let mut appended = 0;
        for child in children {
            let token = child.token.as_str();
            let idx = if token == APPEND_TOKEN {
                appended += 1;
                base_len + appended - 1
            } else {
                let path = parent.child(token);
                let Some(idx) = parse_array_index(token) else {
                    return Err(PatchError::type_mismatch(
                        path.to_string(),
                        "array member token is neither an index nor '-'",
                    )
                    .at_operation(child.index, OperationKind::Add));
                };
                if idx >= base_len {
                    return Err(PatchError::ArrayIndexOutOfRange {
                        path: path.to_string(),
                        index: idx,
                        len: base_len,
                    }
                    .at_operation(child.index, OperationKind::Add));
                }
                idx
            };
            resolved.insert(idx);
        }

        let taken = resolved.iter().filter_map(|&idx| items.get(idx).cloned()).collect();
        self.place(parent, Node::array(taken))?;

        let target = pointer::get_mut(&mut self.remaining, parent)?;
        let Node::Array(current) = &*target else {
            return Err(PatchError::type_mismatch(parent.to_string(), "expected an array"));
        };
        let kept = current
            .iter()
            .enumerate()
            .filter(|(idx, _)| !resolved.contains(idx))
            .map(|(_, node)| node.clone())
            .collect();
        *target = Node::array(kept);
        for idx in resolved {
            self.extracted.push(parent.child(idx.to_string()));
        }
        Ok(())
    }

    /// Stores `container` at `parent` in the added tree, creating object
    /// intermediates on demand.
    fn place(&mut self, parent: &Pointer, container: Node) -> Result<(), PatchError> {
        let Some((ancestors, last)) = parent.split_last() else {
            self.added = Some(container);
            return Ok(());
        };
        let mut current = self.added.get_or_insert_with(|| Node::object(ObjectMap::new()));
        for (depth, token) in ancestors.tokens().iter().enumerate() {
            let Node::Object(map) = current else {
                return Err(intermediate_mismatch(&ancestors, depth));
            };
            current = Arc::make_mut(map)
                .entry(token.clone())
                .or_insert_with(|| Node::object(ObjectMap::new()));
        }
        let Node::Object(map) = current else {
            return Err(intermediate_mismatch(&ancestors, ancestors.len()));
        };
        Arc::make_mut(map).insert(last.to_string(), container);
        Ok(())
    }
}

fn intermediate_mismatch(ancestors: &Pointer, depth: usize) -> PatchError {
    let at = Pointer::from(ancestors.tokens()[..depth].to_vec());
    PatchError::type_mismatch(at.to_string(), "added content can only nest through objects")
}
