mod common;

use common::{arb_node, arb_steps, build_patch, doc, patch};
use jpatch_core::{DeltaKind, Diff, Node, Operation, Patch, PatchError};
use proptest::prelude::*;

fn assert_invertible(original: &Node, operations: &Patch) -> Diff {
    let expected = original.apply_patch(operations).unwrap();
    let record = Diff::prepare(original, operations).unwrap();
    let replayed = record.apply(original).unwrap();
    assert_eq!(replayed, expected);
    assert_eq!(&record.revert(&replayed).unwrap(), original);
    record
}

#[test]
fn object_operations() {
    let original = doc(r#"{"a":1,"b":{"x":10}}"#);
    let operations = Patch::from(vec![
        Operation::add("/b/y", 20),
        Operation::add("/a", 2),
        Operation::replace("/b/x", 11),
    ]);
    let record = assert_invertible(&original, &operations);
    let kinds: Vec<_> = record.deltas().iter().map(|delta| delta.op).collect();
    assert_eq!(kinds, vec![DeltaKind::Add, DeltaKind::Add, DeltaKind::Replace]);
    assert_eq!(
        record.reverse(),
        &Patch::from(vec![
            Operation::replace("/b/x", 10),
            Operation::replace("/a", 1),
            Operation::remove("/b/y"),
        ])
    );
}

#[test]
fn array_operations() {
    let original = doc(r#"{"arr":["A","B"]}"#);
    let operations = patch(
        r#"[
            {"op":"add","path":"/arr/-","value":"C"},
            {"op":"add","path":"/arr/1","value":"X"},
            {"op":"remove","path":"/arr/0"}
        ]"#,
    );
    let record = assert_invertible(&original, &operations);
    assert_eq!(
        record.forward().to_json_string(),
        concat!(
            r#"[{"op":"add","path":"/arr/2","value":"C"},"#,
            r#"{"op":"add","path":"/arr/1","value":"X"},"#,
            r#"{"op":"remove","path":"/arr/0"}]"#,
        )
    );
    assert!(record.deltas().iter().all(|delta| delta.path.last() != Some("-")));
}

#[test]
fn move_between_objects() {
    let original = doc(r#"{"a":{"x":1,"z":3},"b":{}}"#);
    let operations = patch(r#"[{"op":"move","from":"/a/x","path":"/b/y"}]"#);
    let record = assert_invertible(&original, &operations);
    assert_eq!(record.deltas().len(), 2);
}

#[test]
fn move_within_an_array() {
    let original = doc(r#"{"foo":["all","grass","cows","eat"]}"#);
    assert_invertible(&original, &patch(r#"[{"op":"move","from":"/foo/1","path":"/foo/3"}]"#));
    assert_invertible(&original, &patch(r#"[{"op":"move","from":"/foo/3","path":"/foo/0"}]"#));
    assert_invertible(&original, &patch(r#"[{"op":"move","from":"/foo/0","path":"/foo/-"}]"#));
}

#[test]
fn copy_and_array_append() {
    let original = doc(r#"{"src":{"v":5},"arr":[1,2]}"#);
    let operations = patch(r#"[{"op":"copy","from":"/src/v","path":"/arr/-"}]"#);
    let record = assert_invertible(&original, &operations);
    assert_eq!(record.forward(), &Patch::from(vec![Operation::add("/arr/2", 5)]));
    assert_eq!(record.reverse(), &Patch::from(vec![Operation::remove("/arr/2")]));
}

#[test]
fn copy_over_an_array_element() {
    let original = doc(r#"{"arr":["a","b","c"]}"#);
    let operations = patch(r#"[{"op":"copy","from":"/arr/0","path":"/arr/2"}]"#);
    let record = assert_invertible(&original, &operations);
    assert_eq!(record.forward(), &Patch::from(vec![Operation::replace("/arr/2", "a")]));
}

#[test]
fn root_replacement_reverts_wholesale() {
    let original = doc(r#"{"x":1}"#);
    let operations = patch(r#"[{"op":"replace","path":"","value":[1,2]}]"#);
    let record = assert_invertible(&original, &operations);
    assert_eq!(record.reverse(), &Patch::from(vec![Operation::replace("", original.clone())]));
}

#[test]
fn failing_test_discards_the_record() {
    let original = doc(r#"{"a":1}"#);
    let operations =
        patch(r#"[{"op":"add","path":"/b","value":2},{"op":"test","path":"/a","value":5}]"#);
    let err = Diff::prepare(&original, &operations).unwrap_err();
    assert_eq!(err.operation_index(), Some(1));
    assert!(matches!(err.root_cause(), PatchError::TestMismatch { .. }));
}

#[test]
fn prepare_reports_the_same_errors_as_apply() {
    let original = doc(r#"{"a":[1]}"#);
    let operations = patch(r#"[{"op":"add","path":"/a/4","value":2}]"#);
    let prepared = Diff::prepare(&original, &operations).unwrap_err();
    let applied = original.apply_patch(&operations).unwrap_err();
    assert_eq!(prepared, applied);
}

#[test]
fn prepare_leaves_the_original_untouched() {
    let original = doc(r#"{"a":{"b":[1,2]}}"#);
    let snapshot = original.to_string();
    Diff::prepare(&original, &patch(r#"[{"op":"remove","path":"/a/b/0"}]"#)).unwrap();
    assert_eq!(original.to_string(), snapshot);
}

#[test]
fn in_place_apply_and_revert() {
    let original = doc(r#"{"n":[1,2,3]}"#);
    let record = Diff::prepare(&original, &patch(r#"[{"op":"remove","path":"/n/1"}]"#)).unwrap();
    let mut working = original.clone();
    record.apply_in_place(&mut working).unwrap();
    assert_eq!(working, doc(r#"{"n":[1,3]}"#));
    record.revert_in_place(&mut working).unwrap();
    assert_eq!(working, original);
}

#[test]
fn serialized_records_replay_identically() {
    let original = doc(r#"{"a":{"x":1},"list":[true,null]}"#);
    let operations = patch(
        r#"[
            {"op":"move","from":"/a/x","path":"/list/1"},
            {"op":"add","path":"/a/y","value":null},
            {"op":"replace","path":"/list/0","value":false}
        ]"#,
    );
    let record = assert_invertible(&original, &operations);
    let encoded = serde_json::to_string(&record).unwrap();
    assert!(encoded.starts_with(r#"{"deltas":["#));
    assert!(encoded.contains(r#""existed_before":false"#));
    let decoded: Diff = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn serialized_records_keep_float_precision() {
    let original = doc(r#"{"x":9.170865092349498e266,"y":0.1}"#);
    let record = Diff::prepare(&original, &patch(r#"[{"op":"remove","path":"/x"}]"#)).unwrap();
    let decoded: Diff = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
    let patched = decoded.apply(&original).unwrap();
    assert_eq!(decoded.revert(&patched).unwrap(), original);
}

proptest! {
    #[test]
    fn recorded_patches_are_invertible(document in arb_node(), steps in arb_steps()) {
        let operations = build_patch(&document, &steps);
        let expected = document.apply_patch(&operations).unwrap();
        let record = Diff::prepare(&document, &operations).unwrap();
        let replayed = record.apply(&document).unwrap();
        prop_assert_eq!(&replayed, &expected);
        prop_assert_eq!(record.revert(&replayed).unwrap(), document);
    }
}
