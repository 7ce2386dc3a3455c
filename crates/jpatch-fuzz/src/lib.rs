//! Fuzzing harnesses for `jpatch-core`.
//!
//! Each public function accepts raw bytes, derives documents and patches from
//! them with [`arbitrary::Unstructured`] and drives one pipeline of the core
//! crate. Decoding failures are ignored so fuzzers keep exploring; broken
//! invariants panic.
//!
//! # Examples
//!
//! ```
//! jpatch_fuzz::fuzz_canonicalization(b"{\"a\":1}");
//! jpatch_fuzz::fuzz_diff(&[1, 2, 3, 4]);
//! jpatch_fuzz::fuzz_patch(b"example");
//! jpatch_fuzz::fuzz_extract(b"extract");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use arbitrary::Unstructured;
use jpatch_core::{extract_added, Diff, Node, Operation, Patch, Pointer};
use serde_json::{self, Map as JsonMap, Number as JsonNumber, Value as JsonValue};

const MAX_DEPTH: usize = 4;
const MAX_ARRAY_LEN: u8 = 6;
const MAX_OBJECT_LEN: u8 = 6;
const MAX_STRING_LEN: u8 = 12;
const MAX_OPERATIONS: u8 = 8;

/// Feeds arbitrary bytes through document and patch decoding.
///
/// Documents that decode must re-decode to themselves from their compact
/// encoding, and so must patches.
///
/// ```
/// jpatch_fuzz::fuzz_canonicalization(b"[{\"op\":\"remove\",\"path\":\"/a\"}]");
/// ```
pub fn fuzz_canonicalization(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(node) = Node::from_json_str(text) {
        assert_eq!(Node::from_json_str(&node.to_string()).ok(), Some(node));
    }
    let _ = Node::from_yaml_str(text);
    if let Ok(patch) = Patch::from_json_str(text) {
        assert_eq!(Patch::from_json_str(&patch.to_json_string()).ok(), Some(patch));
    }
}

/// Diffs two random documents and checks that the patch converts one into the
/// other.
///
/// ```
/// jpatch_fuzz::fuzz_diff(b"seed");
/// ```
pub fn fuzz_diff(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let lhs = random_node(&mut unstructured);
    let rhs = random_node(&mut unstructured);
    let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
        return;
    };
    let patch = lhs.diff(&rhs);
    assert_eq!(lhs.apply_patch(&patch).ok(), Some(rhs));
    assert!(lhs.diff(&lhs).is_empty());
}

/// Applies random patches to random documents.
///
/// Whenever a patch applies cleanly, its delta record must replay to the same
/// result and revert to the original. The raw bytes are also tried as a wire
/// patch to exercise decoding and error paths.
///
/// ```
/// jpatch_fuzz::fuzz_patch(b"patch fuzz");
/// ```
pub fn fuzz_patch(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    if let Some((document, patch)) = random_case(&mut unstructured) {
        let snapshot = document.clone();
        if let Ok(patched) = document.apply_patch(&patch) {
            let record = Diff::prepare(&document, &patch).ok();
            let Some(record) = record else {
                panic!("prepare failed for a patch that applies: {}", patch.to_json_string());
            };
            assert_eq!(record.apply(&document).ok().as_ref(), Some(&patched));
            assert_eq!(record.revert(&patched).ok().as_ref(), Some(&document));
        }
        assert_eq!(document, snapshot);
    }

    if let Ok(patch) = std::str::from_utf8(data).map(Patch::from_json_str) {
        let mut unstructured = Unstructured::new(data);
        if let (Ok(patch), Some(seed)) = (patch, random_node(&mut unstructured)) {
            let _ = seed.apply_patch(&patch);
        }
    }
}

/// Runs added-content extraction on the result of random patches.
///
/// The patched document must stay untouched by extraction.
///
/// ```
/// jpatch_fuzz::fuzz_extract(b"extract fuzz");
/// ```
pub fn fuzz_extract(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Some((document, patch)) = random_case(&mut unstructured) else {
        return;
    };
    let Ok(after) = document.apply_patch(&patch) else {
        return;
    };
    let snapshot = after.clone();
    if let Ok(extraction) = extract_added(&after, &patch) {
        let has_adds = patch.iter().any(|op| matches!(op, Operation::Add { .. }));
        assert_eq!(extraction.added.is_some(), has_adds);
    }
    assert_eq!(after, snapshot);
}

fn random_case(unstructured: &mut Unstructured<'_>) -> Option<(Node, Patch)> {
    let document = random_node(unstructured)?;
    let patch = random_patch(unstructured, &document).ok()?;
    Some((document, patch))
}

fn random_patch(
    unstructured: &mut Unstructured<'_>,
    document: &Node,
) -> Result<Patch, arbitrary::Error> {
    let len = unstructured.int_in_range::<u8>(0..=MAX_OPERATIONS)?;
    let mut patch = Patch::new();
    for _ in 0..len {
        let path = random_pointer(unstructured, document)?;
        let operation = match unstructured.int_in_range::<u8>(0..=5)? {
            0 => Operation::add(path, random_value(unstructured)?),
            1 => Operation::remove(path),
            2 => Operation::replace(path, random_value(unstructured)?),
            3 => Operation::move_from(random_pointer(unstructured, document)?, path),
            4 => Operation::copy_from(random_pointer(unstructured, document)?, path),
            _ => {
                let value = match document.get(&path) {
                    Ok(current) if unstructured.arbitrary()? => current.clone(),
                    _ => random_value(unstructured)?,
                };
                Operation::test(path, value)
            }
        };
        patch.push(operation);
    }
    Ok(patch)
}

/// Walks `document` from the root, mostly along existing members, and returns
/// the pointer where the walk stopped.
fn random_pointer(
    unstructured: &mut Unstructured<'_>,
    document: &Node,
) -> Result<String, arbitrary::Error> {
    let mut pointer = Pointer::root();
    let mut current = Some(document);
    while unstructured.ratio(3u8, 4u8)? {
        let token = match current {
            Some(Node::Array(items)) => match unstructured.int_in_range::<u8>(0..=4)? {
                0 => "-".to_string(),
                _ => unstructured.int_in_range(0..=items.len())?.to_string(),
            },
            Some(Node::Object(members)) if !members.is_empty() && unstructured.ratio(4u8, 5u8)? => {
                let idx = unstructured.int_in_range(0..=members.len() - 1)?;
                members.keys().nth(idx).cloned().unwrap_or_default()
            }
            _ => random_string(unstructured)?,
        };
        current = current.and_then(|node| match node {
            Node::Array(items) => token.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            Node::Object(members) => members.get(&token),
            _ => None,
        });
        pointer.push(token);
        if pointer.len() > MAX_DEPTH + 1 {
            break;
        }
    }
    Ok(pointer.to_string())
}

fn random_value(unstructured: &mut Unstructured<'_>) -> Result<Node, arbitrary::Error> {
    let value = json_value_from_unstructured(unstructured, MAX_DEPTH - 1)?;
    Node::from_json_value(value).map_err(|_| arbitrary::Error::IncorrectFormat)
}

fn random_node(unstructured: &mut Unstructured<'_>) -> Option<Node> {
    let value = json_value_from_unstructured(unstructured, 0).ok()?;
    Node::from_json_value(value).ok()
}

fn json_value_from_unstructured(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if depth >= MAX_DEPTH {
        return json_leaf(unstructured);
    }

    match unstructured.int_in_range::<u8>(0..=5)? {
        0..=3 if depth == 0 => json_container(unstructured, depth),
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        3 => Ok(JsonValue::String(random_string(unstructured)?)),
        _ => json_container(unstructured, depth),
    }
}

fn json_container(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if unstructured.arbitrary()? {
        let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_ARRAY_LEN)?);
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(json_value_from_unstructured(unstructured, depth + 1)?);
        }
        Ok(JsonValue::Array(items))
    } else {
        let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_OBJECT_LEN)?);
        let mut map = JsonMap::new();
        for _ in 0..len {
            let key = random_string(unstructured)?;
            let value = json_value_from_unstructured(unstructured, depth + 1)?;
            map.insert(key, value);
        }
        Ok(JsonValue::Object(map))
    }
}

fn json_leaf(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    match unstructured.int_in_range::<u8>(0..=3)? {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        _ => Ok(JsonValue::String(random_string(unstructured)?)),
    }
}

fn random_number(unstructured: &mut Unstructured<'_>) -> Result<JsonNumber, arbitrary::Error> {
    if unstructured.arbitrary()? {
        // Stay within the range f64 represents exactly.
        let int = unstructured.int_in_range::<i64>(-(1 << 53)..=(1 << 53))?;
        Ok(JsonNumber::from(int))
    } else {
        let numerator = f64::from(unstructured.arbitrary::<i32>()?);
        let denominator = f64::from(unstructured.int_in_range::<u16>(1..=1024)?);
        JsonNumber::from_f64(numerator / denominator).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

/// Printable ASCII, biased towards the characters pointers escape.
fn random_string(unstructured: &mut Unstructured<'_>) -> Result<String, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_STRING_LEN)?);
    let mut string = String::with_capacity(len);
    for _ in 0..len {
        let ch = match unstructured.int_in_range::<u8>(0..=9)? {
            0 => '~',
            1 => '/',
            _ => char::from(unstructured.int_in_range::<u8>(0x20..=0x7e)?),
        };
        string.push(ch);
    }
    Ok(string)
}
