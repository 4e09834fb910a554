//! Diagnostics: structured failures from parse and run, with source ranges
//! and candidate fixes.
//!
//! Engine failures cross the boundary as opaque error handles. The only
//! structured content a client can extract is a [`CanonicalError`]
//! (domain/code/message); everything else — range projections, fix lists,
//! fix descriptions — goes through dedicated queries that resupply the
//! source text, because a diagnostic does not retain the text it was
//! computed from (only a fingerprint of it).

mod fix;

pub use fix::{FixEdit, SourceFix};

use crate::source::{SourceFingerprint, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

// =============================================================================
// Domains and codes
// =============================================================================

/// Which subsystem produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    /// Source text failed to parse.
    Parse,
    /// A parsed program failed during execution.
    Runtime,
    /// The service itself refused the operation (e.g. a handle that did not
    /// resolve).
    Service,
}

impl ErrorDomain {
    /// Reverse-DNS style domain string, NSError-fashion.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorDomain::Parse => "langsvc.parse",
            ErrorDomain::Runtime => "langsvc.runtime",
            ErrorDomain::Service => "langsvc.service",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error code for a parse failure.
pub const CODE_PARSE_FAILURE: i32 = 1;
/// Error code for a run failure.
pub const CODE_RUN_FAILURE: i32 = 2;
/// Error code for a handle that did not resolve.
pub const CODE_NOT_FOUND: i32 = 3;

// =============================================================================
// Engine-facing failures
// =============================================================================

/// A parse failure as produced by a language module.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
    /// Candidate fixes in ranked order, best first. May be empty.
    pub fixes: Vec<SourceFix>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
            fixes: Vec::new(),
        }
    }

    pub fn with_fixes(mut self, fixes: Vec<SourceFix>) -> Self {
        self.fixes = fixes;
        self
    }
}

/// An execution failure as produced by a language module's runtime.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

// =============================================================================
// Diagnostics (registry-resident)
// =============================================================================

/// The engine-side object behind an error handle.
///
/// Remains valid independent of whether the originating program or module
/// has since been released; it owns its message, location, and fixes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    domain: ErrorDomain,
    code: i32,
    message: String,
    location: Option<SourceLocation>,
    /// Fingerprint of the source that produced this diagnostic, if any.
    /// Range queries refuse to answer against text that doesn't match.
    fingerprint: Option<SourceFingerprint>,
    fixes: Vec<SourceFix>,
}

impl Diagnostic {
    /// Wraps a parse failure, binding it to the text that was parsed.
    pub fn from_parse_error(error: ParseError, source: &str) -> Self {
        Self {
            domain: ErrorDomain::Parse,
            code: CODE_PARSE_FAILURE,
            message: error.message,
            location: Some(error.location),
            fingerprint: Some(SourceFingerprint::of(source)),
            fixes: error.fixes,
        }
    }

    /// Wraps a run failure, binding it to the program's source text.
    pub fn from_runtime_error(error: RuntimeError, source: &str) -> Self {
        Self {
            domain: ErrorDomain::Runtime,
            code: CODE_RUN_FAILURE,
            message: error.message,
            location: error.location,
            fingerprint: Some(SourceFingerprint::of(source)),
            fixes: Vec::new(),
        }
    }

    /// A service-domain diagnostic for a handle that did not resolve.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            domain: ErrorDomain::Service,
            code: CODE_NOT_FOUND,
            message: message.into(),
            location: None,
            fingerprint: None,
            fixes: Vec::new(),
        }
    }

    pub fn domain(&self) -> ErrorDomain {
        self.domain
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts to the transport-safe structured error value. This is the
    /// only place structured error content crosses the boundary.
    pub fn materialize(&self) -> CanonicalError {
        CanonicalError {
            domain: self.domain.as_str().to_string(),
            code: self.code,
            message: self.message.clone(),
        }
    }

    /// Candidate fixes in ranked order, best first.
    pub fn fixes(&self) -> &[SourceFix] {
        &self.fixes
    }

    /// True if `source` is the exact text this diagnostic was computed from.
    fn accepts(&self, source: &str) -> bool {
        matches!(&self.fingerprint, Some(fp) if fp.matches(source))
    }

    /// Zero-based line range of the fault, or `None` if the diagnostic has
    /// no location or `source` is not the text it was computed from.
    pub fn line_range(&self, source: &str) -> Option<Range<usize>> {
        if !self.accepts(source) {
            return None;
        }
        self.location.as_ref()?.line_range(source)
    }

    /// Zero-based column range of the fault. Same staleness rules as
    /// [`line_range`](Diagnostic::line_range).
    pub fn column_range(&self, source: &str) -> Option<Range<usize>> {
        if !self.accepts(source) {
            return None;
        }
        self.location.as_ref()?.column_range(source)
    }

    /// Character range of the fault. Same staleness rules as
    /// [`line_range`](Diagnostic::line_range).
    pub fn character_range(&self, source: &str) -> Option<Range<usize>> {
        if !self.accepts(source) {
            return None;
        }
        self.location.as_ref()?.character_range(source)
    }
}

// =============================================================================
// Canonical errors
// =============================================================================

/// Transport-safe structured error value: domain, code, message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalError {
    pub domain: String,
    pub code: i32,
    pub message: String,
}

impl fmt::Display for CanonicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} code {})", self.message, self.domain, self.code)
    }
}
