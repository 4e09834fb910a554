//! Source text bookkeeping: locations, origins, and fingerprints.
//!
//! The service is stateless with respect to source text: an error handle
//! records only a character range plus a fingerprint of the text it was
//! computed against. Callers resupply the text for every range query, and a
//! mismatched resupply yields "no range" rather than a fabricated one.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Range;

// =============================================================================
// Fingerprints
// =============================================================================

/// Fingerprint of a source string, used to detect stale input.
///
/// Diagnostics and fixes store the fingerprint of the exact text they were
/// computed from. Operations that take resupplied source compare fingerprints
/// before trusting any stored offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFingerprint(u64);

impl SourceFingerprint {
    /// Computes the fingerprint of a source string.
    pub fn of(source: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Returns true if `source` matches this fingerprint.
    pub fn matches(&self, source: &str) -> bool {
        *self == Self::of(source)
    }
}

// =============================================================================
// Origins
// =============================================================================

/// Optional origin tag for parsed source (e.g. a file path or URL).
///
/// Used only for diagnostics; never affects parse semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOrigin(String);

impl SourceOrigin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Locations
// =============================================================================

/// A half-open character range within a source string.
///
/// Offsets count Unicode scalar values, not bytes, so they are meaningful to
/// clients that index strings by character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Character range, `start..end`, end exclusive. May be empty (a caret
    /// position, e.g. end-of-input).
    pub range: Range<usize>,
}

impl SourceLocation {
    pub fn new(range: Range<usize>) -> Self {
        Self { range }
    }

    /// An empty location at a single character offset.
    pub fn at(offset: usize) -> Self {
        Self {
            range: offset..offset,
        }
    }

    /// Returns the character range, validated against `source`.
    ///
    /// `None` if the range does not lie within the text.
    pub fn character_range(&self, source: &str) -> Option<Range<usize>> {
        let len = source.chars().count();
        if self.range.start > self.range.end || self.range.end > len {
            return None;
        }
        Some(self.range.clone())
    }

    /// Projects the location onto zero-based line numbers.
    ///
    /// Returns `start_line..end_line + 1` covering every line the range
    /// touches, or `None` if the range is out of bounds.
    pub fn line_range(&self, source: &str) -> Option<Range<usize>> {
        self.character_range(source)?;
        let start_line = line_of(source, self.range.start);
        // An empty range still covers the line its caret sits on.
        let last_offset = if self.range.is_empty() {
            self.range.start
        } else {
            self.range.end - 1
        };
        let end_line = line_of(source, last_offset);
        Some(start_line..end_line + 1)
    }

    /// Projects the location onto zero-based columns within its start line.
    ///
    /// A range that continues past its first line is clamped to that line's
    /// end, so the result is never backwards.
    pub fn column_range(&self, source: &str) -> Option<Range<usize>> {
        self.character_range(source)?;
        let start_col = column_of(source, self.range.start);
        if self.range.is_empty() {
            return Some(start_col..start_col);
        }
        let start_line = line_of(source, self.range.start);
        let last_offset = self.range.end - 1;
        let end_col = if line_of(source, last_offset) == start_line {
            column_of(source, last_offset) + 1
        } else {
            line_length(source, start_line)
        };
        Some(start_col..end_col)
    }

    /// Extracts the located text from `source`, or an empty string for an
    /// empty or out-of-bounds range.
    pub fn snippet<'s>(&self, source: &'s str) -> &'s str {
        match char_range_to_byte_range(source, &self.range) {
            Some(bytes) => &source[bytes],
            None => "",
        }
    }
}

/// Zero-based line number containing the character at `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    source
        .chars()
        .take(offset)
        .filter(|&c| c == '\n')
        .count()
}

/// Character count of the zero-based line `line`, excluding its newline.
fn line_length(source: &str, line: usize) -> usize {
    source
        .split('\n')
        .nth(line)
        .map(|text| text.chars().count())
        .unwrap_or(0)
}

/// Zero-based column of the character at `offset` within its line.
fn column_of(source: &str, offset: usize) -> usize {
    let mut col = 0;
    for c in source.chars().take(offset) {
        if c == '\n' {
            col = 0;
        } else {
            col += 1;
        }
    }
    col
}

/// Converts a character range into a byte range into `source`.
///
/// `None` if the range falls outside the text.
pub fn char_range_to_byte_range(source: &str, range: &Range<usize>) -> Option<Range<usize>> {
    if range.start > range.end {
        return None;
    }
    let start = byte_offset(source, range.start)?;
    let end = byte_offset(source, range.end)?;
    Some(start..end)
}

/// Byte offset of the character at character offset `offset`.
///
/// `offset == char count` maps to `source.len()` (end position).
pub fn byte_offset(source: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_idx, _) in source.char_indices() {
        if count == offset {
            return Some(byte_idx);
        }
        count += 1;
    }
    count += 1; // past the final character
    if offset < count {
        Some(source.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_matches_same_text() {
        let fp = SourceFingerprint::of("1 + 2");
        assert!(fp.matches("1 + 2"));
        assert!(!fp.matches("1 + 3"));
    }

    #[test]
    fn test_character_range_in_bounds() {
        let loc = SourceLocation::new(4..4);
        assert_eq!(loc.character_range("1 + "), Some(4..4));
    }

    #[test]
    fn test_character_range_out_of_bounds() {
        let loc = SourceLocation::new(3..9);
        assert_eq!(loc.character_range("1 + 2"), None);
    }

    #[test]
    fn test_line_range_single_line() {
        let loc = SourceLocation::new(0..5);
        assert_eq!(loc.line_range("1 + 2"), Some(0..1));
    }

    #[test]
    fn test_line_range_spans_lines() {
        let source = "1 +\n2 +\n3";
        // covers "2 +\n3"
        let loc = SourceLocation::new(4..9);
        assert_eq!(loc.line_range(source), Some(1..3));
    }

    #[test]
    fn test_line_range_caret_at_end() {
        let loc = SourceLocation::at(4);
        assert_eq!(loc.line_range("1 + "), Some(0..1));
    }

    #[test]
    fn test_column_range() {
        let loc = SourceLocation::new(4..5);
        assert_eq!(loc.column_range("1 + 2"), Some(4..5));
    }

    #[test]
    fn test_column_range_second_line() {
        let source = "1\n+ 2";
        let loc = SourceLocation::new(2..3); // the '+'
        assert_eq!(loc.column_range(source), Some(0..1));
    }

    #[test]
    fn test_column_range_spanning_lines_clamps_to_start_line() {
        let source = "1 +\n2";
        // covers "+\n2"; ends at column 0 of the second line
        let loc = SourceLocation::new(2..5);
        assert_eq!(loc.column_range(source), Some(2..3));
    }

    #[test]
    fn test_snippet() {
        let loc = SourceLocation::new(2..3);
        assert_eq!(loc.snippet("1 + 2"), "+");
    }

    #[test]
    fn test_snippet_out_of_bounds_is_empty() {
        let loc = SourceLocation::new(2..30);
        assert_eq!(loc.snippet("1 + 2"), "");
    }

    #[test]
    fn test_byte_offset_multibyte() {
        let source = "é + 2";
        assert_eq!(byte_offset(source, 0), Some(0));
        assert_eq!(byte_offset(source, 1), Some(2)); // é is two bytes
        assert_eq!(byte_offset(source, 5), Some(source.len()));
        assert_eq!(byte_offset(source, 6), None);
    }

    #[test]
    fn test_char_range_to_byte_range() {
        let source = "é + 2";
        assert_eq!(char_range_to_byte_range(source, &(2..3)), Some(3..4));
        assert_eq!(char_range_to_byte_range(source, &(0..9)), None);
    }

    #[test]
    fn test_origin_display() {
        let origin = SourceOrigin::new("file:///tmp/script.calc");
        assert_eq!(origin.to_string(), "file:///tmp/script.calc");
    }
}
