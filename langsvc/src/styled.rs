//! Opaque styled-text blobs for syntax highlighting.
//!
//! The service returns highlighting as an encoded byte blob; rendering is a
//! client concern. The encoding here is a JSON list of classified spans,
//! which a client may decode with [`decode_blob`] — but the service itself
//! never interprets the bytes after encoding them.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Classification of a highlighted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Number,
    Operator,
    Punctuation,
    Keyword,
}

/// A classified character range of the program's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

impl HighlightSpan {
    pub fn new(range: Range<usize>, kind: SpanKind) -> Self {
        Self {
            start: range.start,
            end: range.end,
            kind,
        }
    }
}

/// Encodes spans into an opaque blob. `None` if encoding fails.
pub fn encode_blob(spans: &[HighlightSpan]) -> Option<Vec<u8>> {
    serde_json::to_vec(spans).ok()
}

/// Decodes a blob produced by [`encode_blob`]. Client-side convenience.
pub fn decode_blob(blob: &[u8]) -> Option<Vec<HighlightSpan>> {
    serde_json::from_slice(blob).ok()
}
