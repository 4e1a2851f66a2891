//! Aggregation of converted documents into one question context.

use crate::document::DocumentEntry;
use crate::prompts::document_header;

/// Concatenate the markdown of every converted entry, in order.
///
/// Each document contributes `=== Document: <name> ===`, a newline, then its
/// markdown; documents are separated by a blank line. Pending, converting
/// and failed entries are left out. Returns an empty string when nothing is
/// converted.
pub fn build(entries: &[DocumentEntry]) -> String {
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .converted_markdown()
                .map(|markdown| format!("{}\n{}", document_header(entry.name()), markdown))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
