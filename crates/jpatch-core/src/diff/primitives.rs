use crate::{Node, Operation, Pointer};

/// Replaces the whole value at `path`, root included.
pub(super) fn diff_primitives(rhs: &Node, path: &Pointer, out: &mut Vec<Operation>) {
    out.push(Operation::replace(path.to_string(), rhs.clone()));
}
