//! Parsed programs and the values produced by running them.
//!
//! A program owns its parsed form and observes the module that produced it
//! through a `Weak` reference. Unloading the module while the program is
//! alive is allowed: module-dependent operations (pretty printing,
//! highlighting, running) then fail with an absent value, while queries that
//! only need the parse tree keep working.

use crate::diagnostics::RuntimeError;
use crate::language::{LanguageModule, ParsedUnit, RunContext};
use crate::source::{SourceLocation, SourceOrigin};
use crate::styled;
use std::sync::{Arc, Weak};

// =============================================================================
// Programs
// =============================================================================

/// The engine-side object behind a program handle.
pub struct Program {
    source: String,
    origin: Option<SourceOrigin>,
    module_identifier: String,
    module: Weak<dyn LanguageModule>,
    unit: Box<dyn ParsedUnit>,
}

impl Program {
    pub fn new(
        module: &Arc<dyn LanguageModule>,
        unit: Box<dyn ParsedUnit>,
        source: impl Into<String>,
        origin: Option<SourceOrigin>,
    ) -> Self {
        Self {
            source: source.into(),
            origin,
            module_identifier: module.identifier().to_string(),
            module: Arc::downgrade(module),
            unit,
        }
    }

    /// The exact text this program was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> Option<&SourceOrigin> {
        self.origin.as_ref()
    }

    /// Identifier of the module that parsed this program. Outlives the
    /// module itself.
    pub fn module_identifier(&self) -> &str {
        &self.module_identifier
    }

    fn module(&self) -> Option<Arc<dyn LanguageModule>> {
        self.module.upgrade()
    }

    /// Renders the program in its own module's dialect.
    ///
    /// `None` once the module has been unloaded.
    pub fn pretty_print(&self) -> Option<String> {
        self.module()?.format(self.unit.as_ref())
    }

    /// Renders the program in another module's dialect.
    ///
    /// Works regardless of whether the producing module is still loaded;
    /// `None` if `module` does not understand this program's parsed form.
    pub fn reformat(&self, module: &dyn LanguageModule) -> Option<String> {
        module.format(self.unit.as_ref())
    }

    /// Opaque styled-text blob for this program's source.
    ///
    /// `None` if the module is gone, does not support highlighting, or the
    /// blob fails to encode.
    pub fn highlight_blob(&self) -> Option<Vec<u8>> {
        let spans = self.module()?.highlight(self.unit.as_ref())?;
        styled::encode_blob(&spans)
    }

    /// Executes the program. Re-runnable; runs never mutate parse state.
    pub fn run(&self, context: &RunContext) -> Result<RuntimeObject, RuntimeError> {
        let Some(module) = self.module() else {
            return Err(RuntimeError::new(format!(
                "language module '{}' has been unloaded",
                self.module_identifier
            )));
        };
        module.run(self.unit.as_ref(), context)
    }

    /// The innermost expression containing character `offset`.
    ///
    /// A pure query on the parse tree: keeps working after the module is
    /// unloaded.
    pub fn expression_at(&self, offset: usize) -> Option<Expression> {
        self.unit.expression_at(offset)
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// The engine-side object behind an expression handle: a described,
/// located sub-node of a parsed program.
///
/// Self-contained by construction, so releasing the owning program leaves
/// existing expression handles usable (lazy invalidation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    kind_name: String,
    kind_description: String,
    location: SourceLocation,
}

impl Expression {
    pub fn new(
        kind_name: impl Into<String>,
        kind_description: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind_name: kind_name.into(),
            kind_description: kind_description.into(),
            location,
        }
    }

    /// Short kind name, e.g. `number literal`.
    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }

    /// Sentence-length kind description.
    pub fn kind_description(&self) -> &str {
        &self.kind_description
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

// =============================================================================
// Runtime objects
// =============================================================================

/// The engine-side object behind a runtime object handle.
///
/// The only structural access the boundary offers is a textual description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeObject {
    description: String,
}

impl RuntimeObject {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// An integer value.
    pub fn integer(value: i64) -> Self {
        Self::new(value.to_string())
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
