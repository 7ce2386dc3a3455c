use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::{CanonicalizeError, Number, Patch, PatchError};

/// Object payload shared between copy-on-write clones.
pub type ObjectMap = BTreeMap<String, Node>;

/// The JSON data model every component operates on.
///
/// Containers sit behind [`Arc`], so cloning a node never copies its children.
/// Writers go through [`Arc::make_mut`], which copies a container only while
/// another tree still references it. Two trees may therefore share any
/// untouched subtree without either being able to observe the other's edits.
///
/// ```
/// # use jpatch_core::Node;
/// let doc = Node::from_json_str(r#"{"list":[1,2]}"#)?;
/// let copy = doc.clone();
/// assert!(doc.shares_storage(&copy));
/// # Ok::<(), jpatch_core::CanonicalizeError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number represented as IEEE-754 double precision.
    Number(Number),
    /// JSON string.
    String(String),
    /// JSON array.
    Array(Arc<Vec<Node>>),
    /// JSON object with deterministic key ordering.
    Object(Arc<ObjectMap>),
}

impl Node {
    /// Builds an array node from owned elements.
    #[must_use]
    pub fn array(items: Vec<Node>) -> Self {
        Self::Array(Arc::new(items))
    }

    /// Builds an object node from owned members.
    #[must_use]
    pub fn object(members: ObjectMap) -> Self {
        Self::Object(Arc::new(members))
    }

    /// Parses a JSON string into the canonical node representation.
    ///
    /// ```
    /// # use jpatch_core::Node;
    /// let node = Node::from_json_str("{\"hello\":\"world\"}")?;
    /// assert!(matches!(node, Node::Object(_)));
    /// # Ok::<(), jpatch_core::CanonicalizeError>(())
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self, CanonicalizeError> {
        let value: JsonValue = serde_json::from_str(input)?;
        Self::from_json_value(value)
    }

    /// Parses a YAML string into the canonical node representation.
    ///
    /// ```
    /// # use jpatch_core::Node;
    /// let node = Node::from_yaml_str("---\nanswer: 42\n")?;
    /// assert_eq!(node, Node::from_json_str(r#"{"answer":42}"#)?);
    /// # Ok::<(), jpatch_core::CanonicalizeError>(())
    /// ```
    pub fn from_yaml_str(input: &str) -> Result<Self, CanonicalizeError> {
        let value: YamlValue = serde_yaml::from_str(input)?;
        Self::from_yaml_value(value)
    }

    /// Converts a serde JSON value into a [`Node`].
    pub fn from_json_value(value: JsonValue) -> Result<Self, CanonicalizeError> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(v) => Ok(Self::Bool(v)),
            JsonValue::Number(num) => {
                let Some(as_f64) = num.as_f64() else {
                    return Err(CanonicalizeError::NumberOutOfRange { value: num.to_string() });
                };
                Ok(Self::Number(Number::new(as_f64)?))
            }
            JsonValue::String(s) => Ok(Self::String(s)),
            JsonValue::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    items.push(Self::from_json_value(value)?);
                }
                Ok(Self::array(items))
            }
            JsonValue::Object(map) => {
                let mut object = BTreeMap::new();
                for (key, value) in map {
                    object.insert(key, Self::from_json_value(value)?);
                }
                Ok(Self::object(object))
            }
        }
    }

    fn from_yaml_value(value: YamlValue) -> Result<Self, CanonicalizeError> {
        match value {
            YamlValue::Null => Ok(Self::Null),
            YamlValue::Bool(v) => Ok(Self::Bool(v)),
            YamlValue::Number(num) => {
                if let Some(f) = num.as_f64() {
                    return Ok(Self::Number(Number::new(f)?));
                }
                Err(CanonicalizeError::NumberOutOfRange { value: num.to_string() })
            }
            YamlValue::String(s) => Ok(Self::String(s)),
            YamlValue::Sequence(seq) => {
                let mut items = Vec::with_capacity(seq.len());
                for value in seq {
                    items.push(Self::from_yaml_value(value)?);
                }
                Ok(Self::array(items))
            }
            YamlValue::Mapping(map) => {
                let mut object = BTreeMap::new();
                for (key, value) in map {
                    let key = match key {
                        YamlValue::String(s) => s,
                        other => {
                            return Err(CanonicalizeError::NonStringYamlKey {
                                found: format!("{other:?}"),
                            });
                        }
                    };
                    object.insert(key, Self::from_yaml_value(value)?);
                }
                Ok(Self::object(object))
            }
            YamlValue::Tagged(tagged) => {
                Err(CanonicalizeError::UnsupportedYamlTag { tag: tagged.tag.to_string() })
            }
        }
    }

    /// Converts the node into a serde JSON value.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Number(n) => JsonValue::Number(n.to_json_number()),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(values) => {
                JsonValue::Array(values.iter().map(Self::to_json_value).collect())
            }
            Self::Object(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map.iter() {
                    object.insert(key.clone(), value.to_json_value());
                }
                JsonValue::Object(object)
            }
        }
    }

    /// Short name of the node's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns the elements when the node is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the members when the node is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Self::Object(map) => Some(map.as_ref()),
            _ => None,
        }
    }

    /// Reports whether both nodes are containers backed by the same allocation.
    ///
    /// Scalars never share storage.
    #[must_use]
    pub fn shares_storage(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Resolves a pointer string against this node.
    ///
    /// ```
    /// # use jpatch_core::Node;
    /// let doc = Node::from_json_str(r#"{"a":{"b/c":[true]}}"#)?;
    /// assert_eq!(doc.get("/a/b~1c/0")?, &Node::Bool(true));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn get(&self, pointer: &str) -> Result<&Node, PatchError> {
        let pointer = crate::Pointer::parse(pointer)?;
        crate::pointer::get(self, &pointer)
    }

    /// Computes a JSON Patch that turns `self` into `other`.
    ///
    /// ```
    /// # use jpatch_core::Node;
    /// let lhs = Node::from_json_str(r#"{"a":1}"#)?;
    /// let rhs = Node::from_json_str(r#"{"a":2}"#)?;
    /// let patch = lhs.diff(&rhs);
    /// assert_eq!(patch.to_json_string(), r#"[{"op":"replace","path":"/a","value":2}]"#);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn diff(&self, other: &Self) -> Patch {
        crate::diff::diff(self, other)
    }

    /// Applies a patch to a copy of this node, returning the patched node on success.
    ///
    /// `self` is never modified, even when the patch fails half way.
    ///
    /// ```
    /// # use jpatch_core::{Node, Patch};
    /// let base = Node::from_json_str(r#"{"foo":["bar","baz"]}"#)?;
    /// let patch = Patch::from_json_str(r#"[{"op":"add","path":"/foo/1","value":"qux"}]"#)?;
    /// let patched = base.apply_patch(&patch)?;
    /// assert_eq!(patched, Node::from_json_str(r#"{"foo":["bar","qux","baz"]}"#)?);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn apply_patch(&self, patch: &Patch) -> Result<Self, PatchError> {
        crate::patch::apply(self, patch)
    }

    /// Applies a patch directly to this node.
    ///
    /// On failure the node is left in an unspecified, partially patched state
    /// and should be discarded.
    pub fn apply_patch_in_place(&mut self, patch: &Patch) -> Result<(), PatchError> {
        crate::patch::apply_in_place(self, patch)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Number(n) => n.to_json_number().serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Self::from_json_value(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<JsonValue> for Node {
    type Error = CanonicalizeError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_json_value(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Self::array(value)
    }
}
