//! Synthetic corpora for the `jpatch` benchmarks.
//!
//! Each corpus deterministically generates a "before" document, an edited
//! "after" document and the patch between them, plus an append-only patch for
//! extraction. Benchmarks need no fixture files and produce comparable numbers
//! across runs.
//!
//! # Examples
//!
//! ```
//! let corpus = &jpatch_benches::available_corpora()[0];
//! let dataset = corpus.load()?;
//! assert_eq!(dataset.before().apply_patch(dataset.patch())?, *dataset.after());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use jpatch_core::{CanonicalizeError, Node, Operation, Patch};
use serde_json::{json, Value};

/// A named, deterministically generated benchmark input.
#[derive(Clone, Copy, Debug)]
pub struct Corpus {
    name: &'static str,
    records: usize,
}

static CORPORA: [Corpus; 3] = [
    Corpus { name: "small", records: 16 },
    Corpus { name: "medium", records: 256 },
    Corpus { name: "large", records: 4096 },
];

/// Lists the registered corpora, smallest first.
#[must_use]
pub fn available_corpora() -> &'static [Corpus] {
    &CORPORA
}

impl Corpus {
    /// Short identifier used as the benchmark parameter.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of records in the generated `items` array.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Builds the documents and the patch connecting them.
    pub fn load(&self) -> Result<Dataset, CanonicalizeError> {
        let before_value = catalog(self.records, 0);
        let after_value = edited(self.records);
        let bytes = before_value.to_string().len();
        let before = Node::from_json_value(before_value)?;
        let after = Node::from_json_value(after_value)?;
        let patch = before.diff(&after);

        let mut extended = catalog(self.records, 0);
        let mut additions = Patch::new();
        for id in appended(self.records) {
            let fresh = record(id, 1);
            additions.push(Operation::add("/items/-", Node::from_json_value(fresh.clone())?));
            if let Some(items) = extended["items"].as_array_mut() {
                items.push(fresh);
            }
        }
        extended["generated"] = json!(true);
        additions.push(Operation::add("/generated", true));
        let extended = Node::from_json_value(extended)?;

        Ok(Dataset { before, after, patch, extended, additions, bytes })
    }
}

/// Documents and patch generated by [`Corpus::load`].
#[derive(Clone, Debug)]
pub struct Dataset {
    before: Node,
    after: Node,
    patch: Patch,
    extended: Node,
    additions: Patch,
    bytes: usize,
}

impl Dataset {
    /// The unedited document.
    #[must_use]
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// The edited document.
    #[must_use]
    pub fn after(&self) -> &Node {
        &self.after
    }

    /// Patch turning [`Dataset::before`] into [`Dataset::after`].
    #[must_use]
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// The unedited document with fresh records appended.
    #[must_use]
    pub fn extended(&self) -> &Node {
        &self.extended
    }

    /// Append-only patch turning [`Dataset::before`] into [`Dataset::extended`].
    #[must_use]
    pub fn additions(&self) -> &Patch {
        &self.additions
    }

    /// Size of the compact JSON encoding of the unedited document.
    #[must_use]
    pub fn fixture_bytes(&self) -> usize {
        self.bytes
    }
}

fn appended(records: usize) -> std::ops::Range<usize> {
    records..records + records / 8 + 1
}

fn record(id: usize, revision: usize) -> Value {
    json!({
        "id": id,
        "name": format!("item-{id}"),
        "active": id % 3 != 0,
        "score": (id as f64) / 8.0,
        "tags": [format!("t{}", id % 5), format!("rev{revision}")],
        "meta": {"owner": format!("user-{}", id % 17), "path": format!("/items/{id}")},
    })
}

fn catalog(records: usize, revision: usize) -> Value {
    let items: Vec<Value> = (0..records).map(|id| record(id, revision)).collect();
    json!({"version": revision, "title": "catalog", "items": items})
}

/// Renames every 7th record, drops every 11th, moves tags around on every
/// 13th and appends a few fresh records.
fn edited(records: usize) -> Value {
    let mut items = Vec::with_capacity(records + records / 8);
    for id in 0..records {
        if id % 11 == 5 {
            continue;
        }
        let mut item = record(id, 0);
        if id % 7 == 0 {
            item["name"] = json!(format!("renamed-{id}"));
        }
        if id % 13 == 0 {
            item["tags"] = json!(["rev0", format!("t{}", id % 5), "hot"]);
        }
        items.push(item);
    }
    for id in appended(records) {
        items.push(record(id, 1));
    }
    json!({"version": 1, "title": "catalog", "items": items, "generated": true})
}
