//! Pluggable language modules and the reference-counted module loader.
//!
//! A language module implements parsing, formatting, highlighting, and
//! execution for one language or dialect, and is loaded by string
//! identifier. Modules are the engine's only extension seam: the service
//! never sees ASTs or values directly, only the trait surface here.
//!
//! # Loading policy
//!
//! Loading is shared and reference-counted per identifier: repeated loads of
//! the same identifier return the same live handle and bump a count, and
//! unload only frees the module when the count reaches zero. Unloading while
//! programs derived from the module are still alive is permitted — programs
//! observe their module through a `Weak`, so module-dependent operations on
//! them fail cleanly (absent value) once the module is gone.

pub mod calc;

use crate::diagnostics::{ParseError, RuntimeError};
use crate::program::{Expression, RuntimeObject};
use crate::registry::{Handle, Pool};
use crate::source::SourceOrigin;
use semver::Version;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// =============================================================================
// Protocol version
// =============================================================================

/// The module protocol version this service speaks.
///
/// Pre-1.0, every minor version is treated as ABI-breaking: a module is
/// loadable only if its declared version matches on major AND minor.
pub fn protocol_version() -> Version {
    Version::new(0, 2, 0)
}

fn is_compatible(declared: &Version) -> bool {
    let required = protocol_version();
    declared.major == required.major && declared.minor == required.minor
}

// =============================================================================
// Module trait
// =============================================================================

/// Ambient execution context supplied by the caller at run time.
///
/// Both fields are optional; their absence is a valid configuration.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Display name of the script being run.
    pub script_name: Option<String>,
    /// Identifier of the frontmost/current application, for languages whose
    /// semantics reference an ambient application.
    pub current_application: Option<String>,
}

/// The parsed form of a program, produced and consumed by modules.
///
/// Opaque to the service apart from offset-based expression lookup, which is
/// a pure query on the parse tree and works even after the producing module
/// has been unloaded.
pub trait ParsedUnit: Send + Sync + 'static {
    /// Downcast support for modules that need their concrete AST back
    /// (formatting, highlighting, running).
    fn as_any(&self) -> &dyn Any;

    /// The innermost expression containing character `offset`, or `None`
    /// for out-of-range or non-locatable offsets.
    fn expression_at(&self, offset: usize) -> Option<Expression>;
}

impl std::fmt::Debug for dyn ParsedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ParsedUnit")
    }
}

/// A loaded language plugin.
pub trait LanguageModule: Send + Sync + 'static {
    /// Stable identifier the module is loaded by, e.g. `lang.calc`.
    fn identifier(&self) -> &str;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Module protocol version the implementation was built against.
    fn declared_protocol_version(&self) -> Version;

    /// Parses source text into a program representation.
    ///
    /// `origin` is a diagnostic tag only and must not affect semantics.
    fn parse(
        &self,
        source: &str,
        origin: Option<&SourceOrigin>,
    ) -> Result<Box<dyn ParsedUnit>, ParseError>;

    /// Renders a parsed unit in this module's dialect.
    ///
    /// `None` if the unit was produced by an incompatible module.
    fn format(&self, unit: &dyn ParsedUnit) -> Option<String>;

    /// Classified highlight spans for a parsed unit.
    ///
    /// Default: highlighting unsupported.
    fn highlight(&self, _unit: &dyn ParsedUnit) -> Option<Vec<crate::styled::HighlightSpan>> {
        None
    }

    /// Executes a parsed unit.
    fn run(&self, unit: &dyn ParsedUnit, context: &RunContext)
        -> Result<RuntimeObject, RuntimeError>;
}

// =============================================================================
// Module registry (factories)
// =============================================================================

/// Identifier + display name for an installable module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub identifier: String,
    pub name: String,
}

type ModuleFactory = Arc<dyn Fn() -> Arc<dyn LanguageModule> + Send + Sync>;

/// Factories for instantiable modules, keyed by identifier.
///
/// Built-in dialects are registered up front; hosts may register more.
pub struct ModuleRegistry {
    factories: HashMap<String, (ModuleDescriptor, ModuleFactory)>,
}

impl ModuleRegistry {
    /// An empty registry with no modules.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in calc dialects installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(
            calc::CALC_IDENTIFIER,
            "Calc",
            Arc::new(|| Arc::new(calc::CalcModule::symbols()) as Arc<dyn LanguageModule>),
        );
        registry.register(
            calc::CALC_WORDS_IDENTIFIER,
            "Calc (worded operators)",
            Arc::new(|| Arc::new(calc::CalcModule::words()) as Arc<dyn LanguageModule>),
        );
        registry
    }

    /// Registers a module factory under an identifier.
    pub fn register(&mut self, identifier: &str, name: &str, factory: ModuleFactory) {
        self.factories.insert(
            identifier.to_string(),
            (
                ModuleDescriptor {
                    identifier: identifier.to_string(),
                    name: name.to_string(),
                },
                factory,
            ),
        );
    }

    /// Instantiates the module registered under `identifier`.
    fn instantiate(&self, identifier: &str) -> Option<Arc<dyn LanguageModule>> {
        let (_, factory) = self.factories.get(identifier)?;
        Some(factory())
    }

    /// Descriptors for every registered module, sorted by identifier.
    pub fn available_modules(&self) -> Vec<ModuleDescriptor> {
        let mut descriptors: Vec<_> = self
            .factories
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        descriptors
    }
}

// =============================================================================
// Module loader
// =============================================================================

/// The engine-side object behind a module handle.
pub struct LoadedModule {
    module: Arc<dyn LanguageModule>,
}

impl LoadedModule {
    pub fn module(&self) -> &Arc<dyn LanguageModule> {
        &self.module
    }
}

/// Opaque handle to a loaded module.
pub type ModuleHandle = Handle<LoadedModule>;

struct SharedEntry {
    handle: ModuleHandle,
    refcount: usize,
}

/// Resolves module identifiers to loaded instances with per-identifier
/// reference counting.
pub struct ModuleLoader {
    registry: ModuleRegistry,
    pool: Pool<LoadedModule>,
    by_identifier: Mutex<HashMap<String, SharedEntry>>,
}

impl ModuleLoader {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            pool: Pool::new(),
            by_identifier: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the module with the given identifier.
    ///
    /// Returns the existing handle (count bumped) if the identifier is
    /// already loaded. `None` for unknown identifiers or modules declaring
    /// an incompatible protocol version.
    pub fn load(&self, identifier: &str) -> Option<ModuleHandle> {
        let mut by_identifier = self
            .by_identifier
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = by_identifier.get_mut(identifier) {
            entry.refcount += 1;
            debug!(
                identifier,
                refcount = entry.refcount,
                "Language module already loaded, sharing"
            );
            return Some(entry.handle);
        }

        let module = self.registry.instantiate(identifier)?;
        let declared = module.declared_protocol_version();
        if !is_compatible(&declared) {
            warn!(
                identifier,
                %declared,
                required = %protocol_version(),
                "Refusing language module with incompatible protocol version"
            );
            return None;
        }

        let handle = self.pool.allocate(LoadedModule { module });
        by_identifier.insert(
            identifier.to_string(),
            SharedEntry {
                handle,
                refcount: 1,
            },
        );
        debug!(identifier, ?handle, "Language module loaded");
        Some(handle)
    }

    /// Looks up a module handle.
    pub fn resolve(&self, handle: ModuleHandle) -> Option<Arc<LoadedModule>> {
        self.pool.resolve(handle)
    }

    /// Releases one reference to a loaded module.
    ///
    /// The module is freed when its count reaches zero; until then the
    /// handle remains valid for every sharer. Returns `false` for handles
    /// that do not resolve (including a second unload past zero).
    pub fn unload(&self, handle: ModuleHandle) -> bool {
        let Some(loaded) = self.pool.resolve(handle) else {
            return false;
        };
        let identifier = loaded.module.identifier().to_string();

        let mut by_identifier = self
            .by_identifier
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let Some(entry) = by_identifier.get_mut(&identifier) else {
            return false;
        };
        if entry.handle != handle {
            return false;
        }

        entry.refcount -= 1;
        if entry.refcount == 0 {
            by_identifier.remove(&identifier);
            self.pool.release(handle);
            debug!(identifier, "Language module unloaded");
        } else {
            debug!(
                identifier,
                refcount = entry.refcount,
                "Language module reference released"
            );
        }
        true
    }

    /// Descriptors for every module the loader can instantiate.
    pub fn available_modules(&self) -> Vec<ModuleDescriptor> {
        self.registry.available_modules()
    }

    /// Number of distinct modules currently loaded.
    pub fn loaded_count(&self) -> usize {
        self.pool.len()
    }

    /// Drops every loaded module. Returns how many were freed.
    pub fn clear(&self) -> usize {
        let mut by_identifier = self
            .by_identifier
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        by_identifier.clear();
        self.pool.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> ModuleLoader {
        ModuleLoader::new(ModuleRegistry::with_builtins())
    }

    #[test]
    fn test_load_builtin_module() {
        let loader = loader();
        let handle = loader.load(calc::CALC_IDENTIFIER).unwrap();
        let loaded = loader.resolve(handle).unwrap();
        assert_eq!(loaded.module().identifier(), calc::CALC_IDENTIFIER);
    }

    #[test]
    fn test_load_unknown_identifier_fails() {
        let loader = loader();
        assert!(loader.load("unknown.lang").is_none());
    }

    #[test]
    fn test_repeated_load_shares_handle() {
        let loader = loader();
        let first = loader.load(calc::CALC_IDENTIFIER).unwrap();
        let second = loader.load(calc::CALC_IDENTIFIER).unwrap();
        assert_eq!(first, second);
        assert_eq!(loader.loaded_count(), 1);
    }

    #[test]
    fn test_unload_respects_refcount() {
        let loader = loader();
        let handle = loader.load(calc::CALC_IDENTIFIER).unwrap();
        let again = loader.load(calc::CALC_IDENTIFIER).unwrap();

        // First unload only drops one reference; the other sharer's handle
        // keeps working.
        assert!(loader.unload(handle));
        assert!(loader.resolve(again).is_some());

        // Second unload frees the module for real.
        assert!(loader.unload(again));
        assert!(loader.resolve(again).is_none());

        // Past zero, unload reports failure rather than faulting.
        assert!(!loader.unload(again));
    }

    #[test]
    fn test_unload_unknown_handle_fails() {
        let loader = loader();
        let handle = loader.load(calc::CALC_IDENTIFIER).unwrap();
        assert!(loader.unload(handle));
        assert!(!loader.unload(handle));
    }

    #[test]
    fn test_distinct_identifiers_are_distinct_modules() {
        let loader = loader();
        let calc = loader.load(calc::CALC_IDENTIFIER).unwrap();
        let words = loader.load(calc::CALC_WORDS_IDENTIFIER).unwrap();
        assert_ne!(calc, words);
        assert_eq!(loader.loaded_count(), 2);
    }

    #[test]
    fn test_available_modules_sorted() {
        let loader = loader();
        let descriptors = loader.available_modules();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].identifier, calc::CALC_IDENTIFIER);
        assert_eq!(descriptors[1].identifier, calc::CALC_WORDS_IDENTIFIER);
    }

    #[test]
    fn test_incompatible_protocol_version_is_refused() {
        struct AncientModule;
        impl LanguageModule for AncientModule {
            fn identifier(&self) -> &str {
                "lang.ancient"
            }
            fn name(&self) -> &str {
                "Ancient"
            }
            fn declared_protocol_version(&self) -> Version {
                Version::new(0, 1, 0)
            }
            fn parse(
                &self,
                _source: &str,
                _origin: Option<&SourceOrigin>,
            ) -> Result<Box<dyn ParsedUnit>, ParseError> {
                unreachable!("never loadable")
            }
            fn format(&self, _unit: &dyn ParsedUnit) -> Option<String> {
                None
            }
            fn run(
                &self,
                _unit: &dyn ParsedUnit,
                _context: &RunContext,
            ) -> Result<RuntimeObject, RuntimeError> {
                unreachable!("never loadable")
            }
        }

        let mut registry = ModuleRegistry::empty();
        registry.register(
            "lang.ancient",
            "Ancient",
            Arc::new(|| Arc::new(AncientModule) as Arc<dyn LanguageModule>),
        );
        let loader = ModuleLoader::new(registry);
        assert!(loader.load("lang.ancient").is_none());
    }

    #[test]
    fn test_clear_frees_everything() {
        let loader = loader();
        let handle = loader.load(calc::CALC_IDENTIFIER).unwrap();
        loader.load(calc::CALC_WORDS_IDENTIFIER).unwrap();
        assert_eq!(loader.clear(), 2);
        assert!(loader.resolve(handle).is_none());
        assert_eq!(loader.loaded_count(), 0);
    }
}
