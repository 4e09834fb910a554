//! Candidate source fixes attached to diagnostics.
//!
//! A fix is a pure edit: applying it to the exact source text it was
//! computed from yields corrected source. Fixes never mutate the diagnostic
//! they came from, and applying a fix to text that has since changed answers
//! `None` instead of guessing.

use crate::source::{byte_offset, SourceFingerprint, SourceLocation};

// =============================================================================
// Edits
// =============================================================================

/// The concrete edit a fix performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixEdit {
    /// Remove the located text.
    Delete { location: SourceLocation },
    /// Insert `text` immediately before the located text.
    InsertBefore {
        text: String,
        location: SourceLocation,
    },
    /// Insert `text` immediately after the located text.
    InsertAfter {
        text: String,
        location: SourceLocation,
    },
}

impl FixEdit {
    fn location(&self) -> &SourceLocation {
        match self {
            FixEdit::Delete { location }
            | FixEdit::InsertBefore { location, .. }
            | FixEdit::InsertAfter { location, .. } => location,
        }
    }
}

// =============================================================================
// Source fixes
// =============================================================================

/// A suggested edit correcting a diagnostic, bound to the source text it was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFix {
    edit: FixEdit,
    /// Optional suggestion template; `{FIX}` is replaced with the edit's
    /// own description.
    suggestion: Option<String>,
    fingerprint: SourceFingerprint,
}

impl SourceFix {
    /// A fix that deletes the located text.
    pub fn deleting(location: SourceLocation, source: &str) -> Self {
        Self {
            edit: FixEdit::Delete { location },
            suggestion: None,
            fingerprint: SourceFingerprint::of(source),
        }
    }

    /// A fix that inserts text before the located text.
    pub fn prepending(text: impl Into<String>, location: SourceLocation, source: &str) -> Self {
        Self {
            edit: FixEdit::InsertBefore {
                text: text.into(),
                location,
            },
            suggestion: None,
            fingerprint: SourceFingerprint::of(source),
        }
    }

    /// A fix that inserts text after the located text.
    pub fn appending(text: impl Into<String>, location: SourceLocation, source: &str) -> Self {
        Self {
            edit: FixEdit::InsertAfter {
                text: text.into(),
                location,
            },
            suggestion: None,
            fingerprint: SourceFingerprint::of(source),
        }
    }

    /// Wraps the fix in a suggestion template. `{FIX}` in the template is
    /// replaced by the edit's own description.
    pub fn suggesting(mut self, template: impl Into<String>) -> Self {
        self.suggestion = Some(template.into());
        self
    }

    pub fn edit(&self) -> &FixEdit {
        &self.edit
    }

    /// Applies the fix, producing corrected source.
    ///
    /// Pure: identical inputs yield identical output. Returns `None` when
    /// `source` is not the exact text the fix was computed from (stale
    /// input), or when the recorded location no longer maps into it.
    pub fn apply(&self, source: &str) -> Option<String> {
        if !self.fingerprint.matches(source) {
            return None;
        }
        let range = self.edit.location().range.clone();
        let start = byte_offset(source, range.start)?;
        let end = byte_offset(source, range.end)?;
        let mut corrected = String::with_capacity(source.len());
        match &self.edit {
            FixEdit::Delete { .. } => {
                corrected.push_str(&source[..start]);
                corrected.push_str(&source[end..]);
            }
            FixEdit::InsertBefore { text, .. } => {
                corrected.push_str(&source[..start]);
                corrected.push_str(text);
                corrected.push_str(&source[start..]);
            }
            FixEdit::InsertAfter { text, .. } => {
                corrected.push_str(&source[..end]);
                corrected.push_str(text);
                corrected.push_str(&source[end..]);
            }
        }
        Some(corrected)
    }

    /// Short description of the edit, e.g. `add '1'`.
    ///
    /// Empty string when the supplied source does not match the text the fix
    /// was computed from.
    pub fn simple_description(&self, source: &str) -> String {
        if !self.fingerprint.matches(source) {
            return String::new();
        }
        let description = match &self.edit {
            FixEdit::Delete { location } => {
                format!("delete '{}'", location.snippet(source))
            }
            FixEdit::InsertBefore { text, .. } | FixEdit::InsertAfter { text, .. } => {
                format!("add '{}'", text)
            }
        };
        self.templated(description)
    }

    /// Description anchored to surrounding source, e.g. `add '1' after '+'`.
    ///
    /// Empty string on stale input, like [`simple_description`].
    ///
    /// [`simple_description`]: SourceFix::simple_description
    pub fn contextual_description(&self, source: &str) -> String {
        if !self.fingerprint.matches(source) {
            return String::new();
        }
        let description = match &self.edit {
            FixEdit::Delete { location } => {
                format!("delete '{}'", location.snippet(source))
            }
            FixEdit::InsertBefore { text, location } => {
                match next_word(source, location.range.start) {
                    Some(word) => format!("add '{}' before '{}'", text, word),
                    None => format!("add '{}'", text),
                }
            }
            FixEdit::InsertAfter { text, location } => {
                match previous_word(source, location.range.end) {
                    Some(word) => format!("add '{}' after '{}'", text, word),
                    None => format!("add '{}'", text),
                }
            }
        };
        self.templated(description)
    }

    fn templated(&self, description: String) -> String {
        match &self.suggestion {
            Some(template) => template.replace("{FIX}", &description),
            None => description,
        }
    }
}

/// The first whitespace-delimited word at or after character offset `from`.
fn next_word(source: &str, from: usize) -> Option<String> {
    let word: String = source
        .chars()
        .skip(from)
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| !c.is_whitespace())
        .collect();
    (!word.is_empty()).then_some(word)
}

/// The last whitespace-delimited word ending at or before character offset
/// `until`.
fn previous_word(source: &str, until: usize) -> Option<String> {
    let leading: Vec<char> = source.chars().take(until).collect();
    let trimmed_len = leading
        .iter()
        .rev()
        .skip_while(|c| c.is_whitespace())
        .count();
    let word: String = leading[..trimmed_len]
        .iter()
        .rev()
        .take_while(|c| !c.is_whitespace())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (!word.is_empty()).then_some(word)
}
