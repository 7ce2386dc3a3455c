//! RFC 6901 JSON Pointer parsing and resolution.
//!
//! A [`Pointer`] holds unescaped reference tokens; its [`Display`](fmt::Display)
//! implementation re-applies `~0`/`~1` escaping. The free functions in this
//! module read and write through pointers with copy-on-write semantics: every
//! container on the write path is made unique with [`Arc::make_mut`] before it
//! is touched, so trees sharing structure with the target never observe the
//! edit.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Node, OperationKind, PatchError};

/// Final token that designates the position one past the end of an array.
pub const APPEND_TOKEN: &str = "-";

/// A parsed JSON Pointer.
///
/// ```
/// # use jpatch_core::Pointer;
/// let pointer = Pointer::parse("/a~1b/~0k/0")?;
/// assert_eq!(pointer.tokens(), ["a/b", "~k", "0"]);
/// assert_eq!(pointer.to_string(), "/a~1b/~0k/0");
/// # Ok::<(), jpatch_core::PatchError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(Vec<String>);

impl Pointer {
    /// The pointer addressing the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses pointer text.
    ///
    /// ```
    /// # use jpatch_core::{Pointer, PatchError};
    /// assert!(Pointer::parse("")?.is_root());
    /// assert_eq!(Pointer::parse("/")?.tokens(), [""]);
    /// assert!(matches!(Pointer::parse("a"), Err(PatchError::MalformedPointer { .. })));
    /// assert!(matches!(Pointer::parse("/~2"), Err(PatchError::MalformedPointer { .. })));
    /// # Ok::<(), PatchError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, PatchError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Err(PatchError::MalformedPointer {
                pointer: input.to_string(),
                reason: "must be empty or start with '/'",
            });
        };
        let mut tokens = Vec::new();
        for raw in rest.split('/') {
            let token = unescape_token(raw).ok_or_else(|| PatchError::MalformedPointer {
                pointer: input.to_string(),
                reason: "'~' must be followed by '0' or '1'",
            })?;
            tokens.push(token);
        }
        Ok(Self(tokens))
    }

    /// Returns the unescaped reference tokens.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Number of reference tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether the pointer has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indicates whether the pointer addresses the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits the pointer into its parent and final token.
    ///
    /// Returns `None` for the root pointer.
    #[must_use]
    pub fn split_last(&self) -> Option<(Pointer, &str)> {
        let (last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), last.as_str()))
    }

    /// Returns the final token, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns a new pointer extended with `token`.
    #[must_use]
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        Self(tokens)
    }

    /// Pushes a token in place.
    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    /// Indicates whether `prefix` addresses this location or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            f.write_str("/")?;
            f.write_str(&escape_token(token))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<String>> for Pointer {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl Serialize for Pointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Escapes `~` and `/` in a single reference token.
///
/// ```
/// # use jpatch_core::pointer::escape_token;
/// assert_eq!(escape_token("a/b~c"), "a~1b~0c");
/// ```
#[must_use]
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if !token.contains(['~', '/']) {
        return Cow::Borrowed(token);
    }
    Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
}

/// Reverses [`escape_token`]; returns `None` on a dangling or unknown escape.
#[must_use]
pub fn unescape_token(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

/// Parses an array index token: ASCII digits without leading zeros.
///
/// The append marker is not an index and yields `None`.
///
/// ```
/// # use jpatch_core::pointer::parse_array_index;
/// assert_eq!(parse_array_index("0"), Some(0));
/// assert_eq!(parse_array_index("12"), Some(12));
/// assert_eq!(parse_array_index("01"), None);
/// assert_eq!(parse_array_index("-"), None);
/// assert_eq!(parse_array_index("+1"), None);
/// assert_eq!(parse_array_index("99999999999999999999999"), Some(usize::MAX));
/// ```
///
/// Indices too large for `usize` saturate to `usize::MAX`, which is past the
/// end of every array.
#[must_use]
pub fn parse_array_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    Some(token.parse().unwrap_or(usize::MAX))
}

/// Resolves `pointer` inside `document`.
pub fn get<'a>(document: &'a Node, pointer: &Pointer) -> Result<&'a Node, PatchError> {
    let mut current = document;
    for (depth, token) in pointer.tokens().iter().enumerate() {
        current = match current {
            Node::Object(map) => map.get(token),
            Node::Array(items) => parse_array_index(token).and_then(|idx| items.get(idx)),
            _ => None,
        }
        .ok_or_else(|| PatchError::not_found(prefix(pointer, depth + 1)))?;
    }
    Ok(current)
}

/// Resolves `pointer` for writing, unsharing every container on the way.
pub fn get_mut<'a>(document: &'a mut Node, pointer: &Pointer) -> Result<&'a mut Node, PatchError> {
    let mut current = document;
    for (depth, token) in pointer.tokens().iter().enumerate() {
        let next = match current {
            Node::Object(map) => Arc::make_mut(map).get_mut(token),
            Node::Array(items) => match parse_array_index(token) {
                Some(idx) => Arc::make_mut(items).get_mut(idx),
                None => None,
            },
            _ => None,
        };
        current = next.ok_or_else(|| PatchError::not_found(prefix(pointer, depth + 1)))?;
    }
    Ok(current)
}

/// Writes `value` at `pointer` without shifting array elements.
///
/// Objects gain or overwrite the key. Arrays overwrite an existing index and
/// append when the token is the append marker or equals the length.
pub fn set(document: &mut Node, pointer: &Pointer, value: Node) -> Result<(), PatchError> {
    let Some((parent, token)) = pointer.split_last() else {
        *document = value;
        return Ok(());
    };
    let parent_node = get_mut(document, &parent)?;
    match parent_node {
        Node::Object(map) => {
            Arc::make_mut(map).insert(token.to_string(), value);
            Ok(())
        }
        Node::Array(items) => {
            let len = items.len();
            let idx = array_slot(pointer, token, len)?;
            if idx > len {
                return Err(PatchError::ArrayIndexOutOfRange {
                    path: pointer.to_string(),
                    index: idx,
                    len,
                });
            }
            let items = Arc::make_mut(items);
            if idx == len {
                items.push(value);
            } else {
                items[idx] = value;
            }
            Ok(())
        }
        other => Err(PatchError::ParentNotContainer {
            path: pointer.to_string(),
            found: other.kind(),
        }),
    }
}

/// Deletes the value at `pointer`, returning it.
pub fn remove(document: &mut Node, pointer: &Pointer) -> Result<Node, PatchError> {
    let Some((parent, token)) = pointer.split_last() else {
        return Err(PatchError::RootOperationUnsupported { op: OperationKind::Remove });
    };
    let parent_node = get_mut(document, &parent)?;
    match parent_node {
        Node::Object(map) => {
            if !map.contains_key(token) {
                return Err(PatchError::not_found(pointer.to_string()));
            }
            Arc::make_mut(map)
                .remove(token)
                .ok_or_else(|| PatchError::not_found(pointer.to_string()))
        }
        Node::Array(items) => match parse_array_index(token) {
            Some(idx) if idx < items.len() => Ok(Arc::make_mut(items).remove(idx)),
            _ => Err(PatchError::not_found(pointer.to_string())),
        },
        other => Err(PatchError::ParentNotContainer {
            path: pointer.to_string(),
            found: other.kind(),
        }),
    }
}

/// Interprets the final token of `pointer` as an array position.
///
/// The append marker maps to `len`. Non-index tokens are a type mismatch.
pub(crate) fn array_slot(pointer: &Pointer, token: &str, len: usize) -> Result<usize, PatchError> {
    if token == APPEND_TOKEN {
        return Ok(len);
    }
    parse_array_index(token).ok_or_else(|| {
        PatchError::type_mismatch(
            pointer.to_string(),
            format!("array member token {token:?} is neither an index nor '-'"),
        )
    })
}

fn prefix(pointer: &Pointer, len: usize) -> String {
    Pointer(pointer.tokens()[..len].to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    fn ptr(text: &str) -> Pointer {
        Pointer::parse(text).unwrap()
    }

    #[test]
    fn parse_and_format_round_trip_escapes() {
        for text in ["", "/", "/a", "/a~1b", "/~0/~1", "/a/0/-", "//x"] {
            assert_eq!(ptr(text).to_string(), text);
        }
    }

    #[test]
    fn get_reports_first_missing_prefix() {
        let document = doc(r#"{"a":{"b":[1]}}"#);
        let err = get(&document, &ptr("/a/c/d")).unwrap_err();
        assert_eq!(err, PatchError::not_found("/a/c"));
        let err = get(&document, &ptr("/a/b/1")).unwrap_err();
        assert_eq!(err, PatchError::not_found("/a/b/1"));
        let err = get(&document, &ptr("/a/b/-")).unwrap_err();
        assert_eq!(err, PatchError::not_found("/a/b/-"));
    }

    #[test]
    fn set_overwrites_and_appends_without_shifting() {
        let mut document = doc("[1,2]");
        set(&mut document, &ptr("/0"), Node::from(9)).unwrap();
        set(&mut document, &ptr("/2"), Node::from(3)).unwrap();
        set(&mut document, &ptr("/-"), Node::from(4)).unwrap();
        assert_eq!(document, doc("[9,2,3,4]"));
        let err = set(&mut document, &ptr("/9"), Node::Null).unwrap_err();
        assert!(matches!(err, PatchError::ArrayIndexOutOfRange { index: 9, len: 4, .. }));
    }

    #[test]
    fn overflowing_index_is_out_of_range() {
        let mut document = doc("[1]");
        let err = set(&mut document, &ptr("/18446744073709551616"), Node::Null).unwrap_err();
        assert!(matches!(err, PatchError::ArrayIndexOutOfRange { index: usize::MAX, len: 1, .. }));
        assert_eq!(document, doc("[1]"));
    }

    #[test]
    fn dash_is_an_ordinary_key_under_objects() {
        let mut document = doc("{}");
        set(&mut document, &ptr("/-"), Node::from(1)).unwrap();
        assert_eq!(document, doc(r#"{"-":1}"#));
    }

    #[test]
    fn set_into_scalar_parent_fails() {
        let mut document = doc(r#"{"a":1}"#);
        let err = set(&mut document, &ptr("/a/b"), Node::Null).unwrap_err();
        assert!(matches!(err, PatchError::ParentNotContainer { found: "number", .. }));
    }

    #[test]
    fn remove_root_is_rejected() {
        let mut document = doc("{}");
        let err = remove(&mut document, &Pointer::root()).unwrap_err();
        assert_eq!(err, PatchError::RootOperationUnsupported { op: OperationKind::Remove });
    }

    #[test]
    fn writes_do_not_leak_into_shared_clones() {
        let original = doc(r#"{"a":{"b":[1,2]},"c":{"d":1}}"#);
        let mut working = original.clone();
        remove(&mut working, &ptr("/a/b/0")).unwrap();
        assert_eq!(original, doc(r#"{"a":{"b":[1,2]},"c":{"d":1}}"#));
        assert_eq!(working, doc(r#"{"a":{"b":[2]},"c":{"d":1}}"#));
        let untouched = get(&original, &ptr("/c")).unwrap();
        assert!(untouched.shares_storage(get(&working, &ptr("/c")).unwrap()));
    }
}
