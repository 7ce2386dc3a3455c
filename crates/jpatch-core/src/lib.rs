//! JSON Patch (RFC 6902) toolkit over a copy-on-write JSON tree.
//!
//! `jpatch-core` applies patches, computes structural diffs, records
//! invertible delta records and splits a patched document by provenance. All
//! components share one tree type, [`Node`], whose containers are
//! reference-counted so untouched subtrees are shared rather than copied.
//!
//! ```
//! use jpatch_core::{Diff, Node};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = Node::from_json_str(r#"{"name":"jpatch","tags":["json"]}"#)?;
//!     let target = Node::from_json_str(r#"{"name":"jpatch","tags":["json","patch"]}"#)?;
//!
//!     let patch = base.diff(&target);
//!     assert_eq!(patch.to_json_string(), r#"[{"op":"add","path":"/tags/1","value":"patch"}]"#);
//!
//!     let record = Diff::prepare(&base, &patch)?;
//!     let patched = record.apply(&base)?;
//!     assert_eq!(patched, target);
//!     assert_eq!(record.revert(&patched)?, base);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod delta;
pub mod diff;
mod error;
mod extract;
mod node;
mod number;
mod patch;
pub mod pointer;
mod stream;

pub use delta::{Delta, DeltaKind, Diff};
pub use error::{CanonicalizeError, PatchError, StreamError};
pub use extract::{extract_added, Extraction};
pub use node::{Node, ObjectMap};
pub use number::Number;
pub use patch::{Operation, OperationKind, Patch};
pub use pointer::Pointer;
pub use stream::apply_stream;

/// Returns the semantic version of the `jpatch-core` crate.
///
/// ```
/// assert!(!jpatch_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
