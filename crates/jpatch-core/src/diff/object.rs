use super::diff_node;
use crate::{node::ObjectMap, Operation, Pointer};

/// Removes keys missing on the right, then recurses into shared keys and adds
/// new ones in key order.
pub(super) fn diff_objects(
    lhs: &ObjectMap,
    rhs: &ObjectMap,
    path: &Pointer,
    out: &mut Vec<Operation>,
) {
    for key in lhs.keys() {
        if !rhs.contains_key(key) {
            out.push(Operation::remove(path.child(key.as_str()).to_string()));
        }
    }

    for (key, value) in rhs {
        let sub_path = path.child(key.as_str());
        match lhs.get(key) {
            Some(previous) => diff_node(previous, value, &sub_path, out),
            None => out.push(Operation::add(sub_path.to_string(), value.clone())),
        }
    }
}
