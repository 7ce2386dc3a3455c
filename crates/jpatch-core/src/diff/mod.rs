//! Structural differ.
//!
//! [`diff`] walks two trees in lockstep and emits RFC 6902 operations that
//! turn the left tree into the right one. Objects recurse per key, arrays go
//! through an LIS-based edit script (see `list`), and anything else becomes a
//! single `replace`.

mod list;
mod object;
mod primitives;

use tracing::debug;

use crate::{Node, Operation, Patch, Pointer};

/// Computes a patch that turns `lhs` into `rhs`.
///
/// Applying the result to `lhs` yields a document deep-equal to `rhs`, and
/// equal inputs produce an empty patch.
///
/// ```
/// # use jpatch_core::{diff::diff, Node};
/// let lhs = Node::from_json_str(r#"{"keep":1,"drop":2,"list":["a","b","c"]}"#)?;
/// let rhs = Node::from_json_str(r#"{"keep":1,"list":["a","c","d"],"new":true}"#)?;
/// let patch = diff(&lhs, &rhs);
/// assert_eq!(
///     patch.to_json_string(),
///     concat!(
///         r#"[{"op":"remove","path":"/drop"},"#,
///         r#"{"op":"remove","path":"/list/1"},"#,
///         r#"{"op":"add","path":"/list/2","value":"d"},"#,
///         r#"{"op":"add","path":"/new","value":true}]"#,
///     ),
/// );
/// assert_eq!(lhs.apply_patch(&patch)?, rhs);
/// assert!(diff(&lhs, &lhs).is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn diff(lhs: &Node, rhs: &Node) -> Patch {
    let mut operations = Vec::new();
    diff_node(lhs, rhs, &Pointer::root(), &mut operations);
    debug!(operations = operations.len(), "computed structural diff");
    Patch::from(operations)
}

fn diff_node(lhs: &Node, rhs: &Node, path: &Pointer, out: &mut Vec<Operation>) {
    if lhs.shares_storage(rhs) || lhs == rhs {
        return;
    }
    match (lhs, rhs) {
        (Node::Object(a), Node::Object(b)) => object::diff_objects(a, b, path, out),
        (Node::Array(a), Node::Array(b)) => list::diff_lists(a, b, path, out),
        _ => primitives::diff_primitives(rhs, path, out),
    }
}
