#![allow(dead_code)]

use jpatch_core::{Node, Operation, Patch};
use proptest::{collection::btree_map, collection::vec, prelude::*, string::string_regex};

pub fn doc(text: &str) -> Node {
    Node::from_json_str(text).unwrap()
}

pub fn patch(text: &str) -> Patch {
    Patch::from_json_str(text).unwrap()
}

pub fn arb_json_value() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        (-50i64..50).prop_map(|n| serde_json::Value::Number(n.into())),
        proptest::num::f64::NORMAL.prop_filter_map("finite", |f| {
            serde_json::Number::from_f64(f).map(serde_json::Value::Number)
        }),
        string_regex("[a-c~/]{0,3}").unwrap().prop_map(serde_json::Value::String),
    ];

    leaf.prop_recursive(3, 24, 4, move |inner| {
        prop_oneof![
            vec(inner.clone(), 0..5).prop_map(serde_json::Value::Array),
            btree_map(string_regex("[a-d~/]{1,2}").unwrap(), inner, 0..4).prop_map(|map| {
                serde_json::Value::Object(map.into_iter().collect())
            }),
        ]
    })
}

pub fn arb_node() -> impl Strategy<Value = Node> {
    arb_json_value().prop_map(|value| Node::from_json_value(value).unwrap())
}

/// One step of a randomly generated patch: operation selector, two location
/// selectors and a payload.
pub type Step = (u8, usize, usize, Node);

pub fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    vec((0u8..6, any::<usize>(), any::<usize>(), arb_node()), 0..8)
}

/// Builds a patch from `steps` that applies cleanly to `document`.
///
/// Each step picks its locations from the document as patched by the steps
/// before it; steps that would fail are dropped.
pub fn build_patch(document: &Node, steps: &[Step]) -> Patch {
    let mut working = document.clone();
    let mut built = Patch::new();
    for (kind, first, second, value) in steps {
        let existing = locations(&working);
        let targets = destinations(&working, *second);
        let pick = |pool: &[String], selector: usize| pool[selector % pool.len()].clone();
        let operation = match *kind {
            0 => Operation::add(pick(&targets, *first), value.clone()),
            1 if existing.len() > 1 => Operation::remove(pick(&existing[1..], *first)),
            2 => Operation::replace(pick(&existing, *first), value.clone()),
            3 if existing.len() > 1 => {
                Operation::move_from(pick(&existing[1..], *first), pick(&targets, *second))
            }
            4 => Operation::copy_from(pick(&existing, *first), pick(&targets, *second)),
            5 => {
                let path = pick(&existing, *first);
                let current = working.get(&path).unwrap().clone();
                Operation::test(path, current)
            }
            _ => continue,
        };
        let single = Patch::from(vec![operation.clone()]);
        if let Ok(next) = working.apply_patch(&single) {
            working = next;
            built.push(operation);
        }
    }
    built
}

/// Every pointer that resolves in `node`, root first.
pub fn locations(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    collect(node, &jpatch_core::Pointer::root(), &mut out);
    out
}

fn collect(node: &Node, at: &jpatch_core::Pointer, out: &mut Vec<String>) {
    out.push(at.to_string());
    match node {
        Node::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                collect(item, &at.child(idx.to_string()), out);
            }
        }
        Node::Object(members) => {
            for (key, value) in members.iter() {
                collect(value, &at.child(key.as_str()), out);
            }
        }
        _ => {}
    }
}

/// Pointers an `add` may target: array slots including the append marker,
/// existing keys, one fresh key per object and the root.
fn destinations(node: &Node, salt: usize) -> Vec<String> {
    let mut out = vec![String::new()];
    for location in locations(node) {
        let pointer = jpatch_core::Pointer::parse(&location).unwrap();
        match node.get(&location).unwrap() {
            Node::Array(items) => {
                for idx in 0..=items.len() {
                    out.push(pointer.child(idx.to_string()).to_string());
                }
                out.push(pointer.child("-").to_string());
            }
            Node::Object(members) => {
                for key in members.keys() {
                    out.push(pointer.child(key.as_str()).to_string());
                }
                out.push(pointer.child(format!("n{}", salt % 3)).to_string());
            }
            _ => {}
        }
    }
    out
}
