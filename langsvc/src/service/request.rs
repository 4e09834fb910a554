//! Request messages for the service daemon.
//!
//! Every boundary operation is one variant carrying its arguments plus a
//! `oneshot` reply sender. Clients build a variant, push it down the mpsc
//! channel, and await the reply; the daemon answers each request exactly
//! once, in completion order.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐                          ┌────────────────┐
//! │ ServiceClient │──► ServiceRequest ─────► │ ServiceDaemon  │
//! └───────────────┘                          │  (registry +   │
//!         ▲                                  │   loader)      │
//!         └──────────── oneshot reply ◄──────┴────────────────┘
//! ```

use crate::diagnostics::CanonicalError;
use crate::language::{ModuleDescriptor, ModuleHandle, RunContext};
use crate::registry::{ErrorHandle, ExpressionHandle, FixHandle, ObjectHandle, ProgramHandle};
use crate::source::SourceOrigin;
use std::ops::Range;
use tokio::sync::oneshot;

/// Reply to a fallible value-or-error operation: exactly one of the success
/// handle or an error handle, never both, never neither.
pub type ParseReply = Result<ProgramHandle, ErrorHandle>;
/// Reply to `run`: an object handle on success, an error handle otherwise.
pub type RunReply = Result<ObjectHandle, ErrorHandle>;

/// A single boundary operation in flight.
#[derive(Debug)]
pub enum ServiceRequest {
    // --- Module lifecycle -------------------------------------------------
    /// Load a language module by identifier. Absent reply for unknown
    /// identifiers or incompatible modules.
    LoadModule {
        identifier: String,
        reply: oneshot::Sender<Option<ModuleHandle>>,
    },
    /// Release one reference to a loaded module. `false` if the handle does
    /// not resolve.
    UnloadModule {
        handle: ModuleHandle,
        reply: oneshot::Sender<bool>,
    },
    /// Enumerate the modules the service can load.
    ListModules {
        reply: oneshot::Sender<Vec<ModuleDescriptor>>,
    },

    // --- Programs ---------------------------------------------------------
    Parse {
        source: String,
        origin: Option<SourceOrigin>,
        module: ModuleHandle,
        reply: oneshot::Sender<ParseReply>,
    },
    ReleaseProgram {
        handle: ProgramHandle,
        reply: oneshot::Sender<bool>,
    },
    Highlight {
        handle: ProgramHandle,
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    PrettyPrint {
        handle: ProgramHandle,
        reply: oneshot::Sender<Option<String>>,
    },
    /// Render a program in a (possibly different) module's dialect.
    Reformat {
        handle: ProgramHandle,
        module: ModuleHandle,
        reply: oneshot::Sender<Option<String>>,
    },
    Run {
        handle: ProgramHandle,
        context: RunContext,
        reply: oneshot::Sender<RunReply>,
    },

    // --- Expressions ------------------------------------------------------
    /// Locate the innermost expression at a character offset.
    LocateExpression {
        offset: usize,
        program: ProgramHandle,
        reply: oneshot::Sender<Option<ExpressionHandle>>,
    },
    DescribeExpressionKind {
        handle: ExpressionHandle,
        reply: oneshot::Sender<Option<String>>,
    },
    DescribeExpressionKindDetail {
        handle: ExpressionHandle,
        reply: oneshot::Sender<Option<String>>,
    },
    ReleaseExpression {
        handle: ExpressionHandle,
        reply: oneshot::Sender<bool>,
    },

    // --- Runtime objects --------------------------------------------------
    DescribeObject {
        handle: ObjectHandle,
        reply: oneshot::Sender<Option<String>>,
    },
    ReleaseObject {
        handle: ObjectHandle,
        reply: oneshot::Sender<bool>,
    },

    // --- Errors and fixes -------------------------------------------------
    /// Convert an error handle into its transport-safe structured value.
    MaterializeError {
        handle: ErrorHandle,
        reply: oneshot::Sender<Option<CanonicalError>>,
    },
    ReleaseError {
        handle: ErrorHandle,
        reply: oneshot::Sender<bool>,
    },
    LineRange {
        handle: ErrorHandle,
        source: String,
        reply: oneshot::Sender<Option<Range<usize>>>,
    },
    ColumnRange {
        handle: ErrorHandle,
        source: String,
        reply: oneshot::Sender<Option<Range<usize>>>,
    },
    CharacterRange {
        handle: ErrorHandle,
        source: String,
        reply: oneshot::Sender<Option<Range<usize>>>,
    },
    /// Ranked candidate fixes for an error, best first. Empty for errors
    /// without fixes or handles that do not resolve.
    FixesForError {
        handle: ErrorHandle,
        reply: oneshot::Sender<Vec<FixHandle>>,
    },
    /// Context-anchored descriptions, positionally aligned 1:1 with `fixes`.
    ContextualFixDescriptions {
        source: String,
        fixes: Vec<FixHandle>,
        reply: oneshot::Sender<Vec<String>>,
    },
    /// Short descriptions, positionally aligned 1:1 with `fixes`.
    SimpleFixDescriptions {
        source: String,
        fixes: Vec<FixHandle>,
        reply: oneshot::Sender<Vec<String>>,
    },
    /// Apply a fix to resupplied source. Absent when the fix no longer
    /// applies to this exact text.
    ApplyFix {
        fix: FixHandle,
        source: String,
        reply: oneshot::Sender<Option<String>>,
    },
}

impl ServiceRequest {
    /// Operation name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceRequest::LoadModule { .. } => "load_module",
            ServiceRequest::UnloadModule { .. } => "unload_module",
            ServiceRequest::ListModules { .. } => "list_modules",
            ServiceRequest::Parse { .. } => "parse",
            ServiceRequest::ReleaseProgram { .. } => "release_program",
            ServiceRequest::Highlight { .. } => "highlight",
            ServiceRequest::PrettyPrint { .. } => "pretty_print",
            ServiceRequest::Reformat { .. } => "reformat",
            ServiceRequest::Run { .. } => "run",
            ServiceRequest::LocateExpression { .. } => "locate_expression",
            ServiceRequest::DescribeExpressionKind { .. } => "describe_expression_kind",
            ServiceRequest::DescribeExpressionKindDetail { .. } => {
                "describe_expression_kind_detail"
            }
            ServiceRequest::ReleaseExpression { .. } => "release_expression",
            ServiceRequest::DescribeObject { .. } => "describe_object",
            ServiceRequest::ReleaseObject { .. } => "release_object",
            ServiceRequest::MaterializeError { .. } => "materialize_error",
            ServiceRequest::ReleaseError { .. } => "release_error",
            ServiceRequest::LineRange { .. } => "line_range",
            ServiceRequest::ColumnRange { .. } => "column_range",
            ServiceRequest::CharacterRange { .. } => "character_range",
            ServiceRequest::FixesForError { .. } => "fixes_for_error",
            ServiceRequest::ContextualFixDescriptions { .. } => "contextual_fix_descriptions",
            ServiceRequest::SimpleFixDescriptions { .. } => "simple_fix_descriptions",
            ServiceRequest::ApplyFix { .. } => "apply_fix",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_channel_round_trip() {
        let (reply, rx) = oneshot::channel();
        let request = ServiceRequest::ListModules { reply };
        assert_eq!(request.name(), "list_modules");

        let ServiceRequest::ListModules { reply } = request else {
            panic!("variant changed");
        };
        reply.send(Vec::new()).unwrap();
        assert!(rx.await.unwrap().is_empty());
    }
}
