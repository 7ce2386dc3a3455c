mod common;

use common::{arb_node, doc, patch};
use jpatch_core::{extract_added, Node, ObjectMap, OperationKind, Patch, PatchError};
use proptest::prelude::*;

fn split(after: &str, operations: &str) -> (Node, Option<Node>) {
    let extraction = extract_added(&doc(after), &patch(operations)).unwrap();
    (extraction.remaining, extraction.added)
}

#[test]
fn appended_elements_are_taken_from_the_end() {
    let (remaining, added) =
        split(r#"{"arr":[1,2,3]}"#, r#"[{"op":"add","path":"/arr/-","value":3}]"#);
    assert_eq!(remaining, doc(r#"{"arr":[1,2]}"#));
    assert_eq!(added, Some(doc(r#"{"arr":[3]}"#)));
}

#[test]
fn several_appends_count_up_from_the_original_length() {
    let (remaining, added) = split(
        r#"{"arr":["a","b","c","d"]}"#,
        r#"[{"op":"add","path":"/arr/-","value":"c"},{"op":"add","path":"/arr/-","value":"d"}]"#,
    );
    assert_eq!(remaining, doc(r#"{"arr":["a","b"]}"#));
    assert_eq!(added, Some(doc(r#"{"arr":["c","d"]}"#)));
}

#[test]
fn indexed_insert_inside_the_original_range() {
    let (remaining, added) =
        split(r#"{"arr":["a","x","b"]}"#, r#"[{"op":"add","path":"/arr/1","value":"x"}]"#);
    assert_eq!(remaining, doc(r#"{"arr":["a","b"]}"#));
    assert_eq!(added, Some(doc(r#"{"arr":["x"]}"#)));
}

#[test]
fn nested_object_member() {
    let (remaining, added) =
        split(r#"{"a":{"b":{"c":1}}}"#, r#"[{"op":"add","path":"/a/b/c","value":1}]"#);
    assert_eq!(remaining, doc(r#"{"a":{"b":{}}}"#));
    assert_eq!(added, Some(doc(r#"{"a":{"b":{"c":1}}}"#)));
}

#[test]
fn repeated_key_uses_the_final_value() {
    let (remaining, added) = split(
        r#"{"k":2,"other":true}"#,
        r#"[{"op":"add","path":"/k","value":1},{"op":"add","path":"/k","value":2}]"#,
    );
    assert_eq!(remaining, doc(r#"{"other":true}"#));
    assert_eq!(added, Some(doc(r#"{"k":2}"#)));
}

#[test]
fn members_of_separate_parents_are_collected_together() {
    let (remaining, added) = split(
        r#"{"a":{"x":1,"y":2},"b":[true,false]}"#,
        r#"[{"op":"add","path":"/a/y","value":2},{"op":"add","path":"/b/-","value":false}]"#,
    );
    assert_eq!(remaining, doc(r#"{"a":{"x":1},"b":[true]}"#));
    assert_eq!(added, Some(doc(r#"{"a":{"y":2},"b":[false]}"#)));
}

#[test]
fn top_level_array_parent() {
    let (remaining, added) = split(r#"["a","b","c"]"#, r#"[{"op":"add","path":"/-","value":"c"}]"#);
    assert_eq!(remaining, doc(r#"["a","b"]"#));
    assert_eq!(added, Some(doc(r#"["c"]"#)));
}

#[test]
fn patches_without_adds_extract_nothing() {
    let after = doc(r#"{"a":[1,2]}"#);
    let operations =
        patch(r#"[{"op":"replace","path":"/a/0","value":1},{"op":"remove","path":"/b"}]"#);
    let extraction = extract_added(&after, &operations).unwrap();
    assert_eq!(extraction.added, None);
    assert!(extraction.remaining.shares_storage(&after));

    let empty = extract_added(&after, &Patch::new()).unwrap();
    assert_eq!(empty.added, None);
    assert_eq!(empty.remaining, after);
}

#[test]
fn input_document_is_not_modified() {
    let after = doc(r#"{"a":{"b":1},"c":[1,2]}"#);
    let snapshot = after.to_string();
    extract_added(&after, &patch(r#"[{"op":"add","path":"/a/b","value":1}]"#)).unwrap();
    assert_eq!(after.to_string(), snapshot);
}

#[test]
fn root_add_is_rejected() {
    let operations = patch(r#"[{"op":"add","path":"","value":1}]"#);
    let err = extract_added(&doc("{}"), &operations).unwrap_err();
    assert_eq!(err.operation_index(), Some(0));
    assert_eq!(err.root_cause(), &PatchError::RootOperationUnsupported { op: OperationKind::Add });
}

#[test]
fn missing_parent_is_reported() {
    let operations = patch(r#"[{"op":"add","path":"/missing/x","value":1}]"#);
    let err = extract_added(&doc("{}"), &operations).unwrap_err();
    assert_eq!(err.operation_index(), Some(0));
    assert!(matches!(err.root_cause(), PatchError::TargetNotFound { path } if path == "/missing"));
}

#[test]
fn scalar_parent_is_rejected() {
    let operations = patch(r#"[{"op":"add","path":"/a/b","value":1}]"#);
    let err = extract_added(&doc(r#"{"a":1}"#), &operations).unwrap_err();
    assert_eq!(err.operation_index(), Some(0));
    assert!(matches!(err.root_cause(), PatchError::TypeMismatch { .. }));
}

#[test]
fn key_token_on_array_parent_is_rejected() {
    let operations = patch(r#"[{"op":"add","path":"/arr/k","value":2}]"#);
    let err = extract_added(&doc(r#"{"arr":[1,2]}"#), &operations).unwrap_err();
    assert!(matches!(err.root_cause(), PatchError::TypeMismatch { path, .. } if path == "/arr/k"));
}

#[test]
fn more_adds_than_elements_is_rejected() {
    let err = extract_added(
        &doc(r#"{"arr":[1]}"#),
        &patch(
            r#"[
                {"op":"add","path":"/arr/-","value":1},
                {"op":"add","path":"/arr/-","value":2}
            ]"#,
        ),
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), PatchError::TypeMismatch { .. }));
}

#[test]
fn extraction_serializes_both_halves() {
    let operations = patch(r#"[{"op":"add","path":"/b","value":2}]"#);
    let extraction = extract_added(&doc(r#"{"a":1,"b":2}"#), &operations).unwrap();
    assert_eq!(
        serde_json::to_string(&extraction).unwrap(),
        r#"{"remaining":{"a":1},"added":{"b":2}}"#
    );
}

proptest! {
    #[test]
    fn new_member_is_split_back_out(existing in arb_node(), value in arb_node()) {
        let base = Node::object(ObjectMap::from([("x".to_string(), existing)]));
        let operations = patch(&format!(r#"[{{"op":"add","path":"/fresh","value":{value}}}]"#));
        let after = base.apply_patch(&operations).unwrap();
        let extraction = extract_added(&after, &operations).unwrap();
        prop_assert_eq!(extraction.remaining, base);
        let expected = Node::object(ObjectMap::from([("fresh".to_string(), value)]));
        prop_assert_eq!(extraction.added, Some(expected));
    }

    #[test]
    fn appended_element_is_split_back_out(existing in arb_node(), value in arb_node()) {
        let base = Node::array(vec![existing]);
        let operations = patch(&format!(r#"[{{"op":"add","path":"/-","value":{value}}}]"#));
        let after = base.apply_patch(&operations).unwrap();
        let extraction = extract_added(&after, &operations).unwrap();
        prop_assert_eq!(extraction.remaining, base);
        prop_assert_eq!(extraction.added, Some(Node::array(vec![value])));
    }
}
