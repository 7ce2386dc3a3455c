use std::io::{Read, Write};

use tracing::debug;

use crate::{Node, Patch, StreamError};

/// Decodes a whole JSON document from `reader`, applies `patch` and writes the
/// compact result to `writer`, followed by a newline.
///
/// The document is fully materialized in memory; nothing is written when
/// decoding or patching fails.
///
/// ```
/// # use jpatch_core::{apply_stream, Patch};
/// let patch = Patch::from_json_str(r#"[{"op":"replace","path":"/n","value":2}]"#)?;
/// let mut out = Vec::new();
/// apply_stream(br#"{"n":1}"#.as_slice(), &mut out, &patch)?;
/// assert_eq!(out, b"{\"n\":2}\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn apply_stream<R, W>(mut reader: R, mut writer: W, patch: &Patch) -> Result<(), StreamError>
where
    R: Read,
    W: Write,
{
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    debug!(bytes = input.len(), operations = patch.len(), "patching streamed document");
    let document = Node::from_json_str(&input)?;
    let patched = document.apply_patch(patch)?;
    serde_json::to_writer(&mut writer, &patched)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
