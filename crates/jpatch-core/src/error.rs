use thiserror::Error;

use crate::OperationKind;

/// Errors that can occur while canonicalizing external data into [`Node`](crate::Node).
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    /// The provided JSON input was invalid.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The provided YAML input was invalid.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Encountered a number that cannot be represented as an IEEE-754 f64.
    #[error("number {value} cannot be represented as f64")]
    NumberOutOfRange {
        /// The textual representation of the offending number.
        value: String,
    },
    /// YAML maps may only contain string keys.
    #[error("unsupported YAML key type: {found}")]
    NonStringYamlKey {
        /// A description of the key that triggered the error.
        found: String,
    },
    /// YAML tags have no JSON counterpart and are rejected.
    #[error("unsupported YAML tag: {tag}")]
    UnsupportedYamlTag {
        /// The tag identifier encountered in the document.
        tag: String,
    },
    /// Attempted to construct a [`Number`](crate::Number) that is not finite.
    #[error("non-finite number encountered: {value}")]
    NotFinite {
        /// The offending numeric value.
        value: f64,
    },
}

/// Errors produced while decoding, applying, preparing or extracting patches.
///
/// Failures raised while executing a patch are wrapped in
/// [`PatchError::Operation`], which records the position and kind of the
/// operation that failed. [`PatchError::root_cause`] strips that wrapper.
///
/// ```
/// # use jpatch_core::{Node, Patch, PatchError};
/// let doc = Node::from_json_str(r#"{"baz":"bar"}"#)?;
/// let patch = Patch::from_json_str(r#"[{"op":"test","path":"/baz","value":"qux"}]"#)?;
/// let err = doc.apply_patch(&patch).unwrap_err();
/// assert!(matches!(err.root_cause(), PatchError::TestMismatch { .. }));
/// assert_eq!(err.to_string(), "patch operation 0 (test) failed");
/// assert!(err.root_cause().to_string().contains("test failed"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatchError {
    /// The pointer string violates RFC 6901 syntax.
    #[error("malformed pointer {pointer:?}: {reason}")]
    MalformedPointer {
        /// The offending pointer text.
        pointer: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Nothing exists at the addressed location (or its parent).
    #[error("target not found: {path:?}")]
    TargetNotFound {
        /// The pointer that failed to resolve.
        path: String,
    },
    /// The parent of the addressed location is a scalar.
    #[error("parent of {path:?} is a {found}, not an object or array")]
    ParentNotContainer {
        /// The pointer whose parent is not a container.
        path: String,
        /// Kind of value found at the parent.
        found: &'static str,
    },
    /// An array index lies beyond the addressable range.
    #[error("array index {index} out of range at {path:?} (length {len})")]
    ArrayIndexOutOfRange {
        /// The pointer carrying the index.
        path: String,
        /// The requested index.
        index: usize,
        /// The length the index was checked against.
        len: usize,
    },
    /// The operation cannot target the document root.
    #[error("{op} at the document root is not supported")]
    RootOperationUnsupported {
        /// The operation kind that targeted the root.
        op: OperationKind,
    },
    /// A `test` operation found a different value.
    #[error("test failed at {path:?}: expected {expected}, found {actual}")]
    TestMismatch {
        /// The tested pointer.
        path: String,
        /// Compact JSON of the expected value.
        expected: String,
        /// Compact JSON of the value found in the document.
        actual: String,
    },
    /// The `op` tag is not one of the six RFC 6902 operations.
    #[error("unsupported patch operation: {op}")]
    UnsupportedOperationKind {
        /// The unrecognised tag.
        op: String,
    },
    /// A container of the wrong kind was found, or received an incompatible token.
    #[error("type mismatch at {path:?}: {reason}")]
    TypeMismatch {
        /// The pointer where the mismatch was detected.
        path: String,
        /// Human readable description.
        reason: String,
    },
    /// A wire record lacks a field its operation requires.
    #[error("{op} operation is missing required field `{field}`")]
    MissingField {
        /// The operation kind of the record.
        op: OperationKind,
        /// The absent field.
        field: &'static str,
    },
    /// The patch document is not a JSON array of operation records.
    #[error("invalid patch document: {reason}")]
    InvalidPatch {
        /// Description of the decoding failure.
        reason: String,
    },
    /// Wraps the failure of a single operation with its position in the patch.
    #[error("patch operation {index} ({op}) failed")]
    Operation {
        /// Zero-based position of the failing operation.
        index: usize,
        /// Kind of the failing operation.
        op: OperationKind,
        /// The underlying failure.
        #[source]
        source: Box<PatchError>,
    },
}

impl PatchError {
    /// Returns the innermost error, skipping [`PatchError::Operation`] wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &PatchError {
        let mut current = self;
        while let Self::Operation { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the index of the failing operation when known.
    #[must_use]
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            Self::Operation { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn at_operation(self, index: usize, op: OperationKind) -> Self {
        Self::Operation { index, op, source: Box::new(self) }
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::TargetNotFound { path: path.into() }
    }

    pub(crate) fn type_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch { path: path.into(), reason: reason.into() }
    }
}

/// Errors raised by [`apply_stream`](crate::apply_stream).
#[derive(Debug, Error)]
pub enum StreamError {
    /// The input document could not be decoded.
    #[error("failed to decode document")]
    Decode(#[from] CanonicalizeError),
    /// The patch could not be applied.
    #[error(transparent)]
    Patch(#[from] PatchError),
    /// The result could not be encoded.
    #[error("failed to encode document")]
    Encode(#[from] serde_json::Error),
    /// Reading the input or writing the output failed.
    #[error("stream I/O failed")]
    Io(#[from] std::io::Error),
}
