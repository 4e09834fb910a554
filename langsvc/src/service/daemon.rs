//! The service daemon: a long-running task that owns the engine state.
//!
//! The daemon is the only component with direct access to the token
//! registry and module loader. It receives [`ServiceRequest`]s via a
//! channel, dispatches them, and answers each through its reply sender.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ServiceDaemon                         │
//! │                                                             │
//! │  ServiceRequest ──► ┌──────────┐                            │
//! │                     │ Dispatch │──► registry / loader ops   │
//! │                     └────┬─────┘      (answered inline)     │
//! │                          │                                  │
//! │                          ▼ run_program                      │
//! │                     ┌──────────┐                            │
//! │                     │  spawn   │──► executes off the loop,  │
//! │                     └──────────┘    replies on completion   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Slow operations (`run`) execute on spawned tasks so they never delay an
//! unrelated request; replies therefore arrive in completion order, not
//! issue order. Shutdown or request-channel closure drains the registry and
//! loader so no handles leak across reconnects.

use crate::config::ServiceConfig;
use crate::diagnostics::Diagnostic;
use crate::language::{ModuleHandle, ModuleLoader, ModuleRegistry, RunContext};
use crate::program::Program;
use crate::registry::{ProgramHandle, Registry};
use crate::service::request::{ParseReply, RunReply, ServiceRequest};
use crate::source::SourceOrigin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// =============================================================================
// Engine state
// =============================================================================

/// Registry plus loader: everything a request needs. Shared with spawned
/// run tasks.
struct Engine {
    registry: Registry,
    loader: ModuleLoader,
}

impl Engine {
    fn parse(
        &self,
        source: &str,
        origin: Option<SourceOrigin>,
        module: ModuleHandle,
    ) -> ParseReply {
        let Some(loaded) = self.loader.resolve(module) else {
            return Err(self
                .registry
                .errors
                .allocate(Diagnostic::not_found("module handle did not resolve")));
        };
        match loaded.module().parse(source, origin.as_ref()) {
            Ok(unit) => Ok(self
                .registry
                .programs
                .allocate(Program::new(loaded.module(), unit, source, origin))),
            Err(error) => Err(self
                .registry
                .errors
                .allocate(Diagnostic::from_parse_error(error, source))),
        }
    }

    fn run(&self, program: &Program, context: &RunContext) -> RunReply {
        match program.run(context) {
            Ok(object) => Ok(self.registry.objects.allocate(object)),
            Err(error) => Err(self
                .registry
                .errors
                .allocate(Diagnostic::from_runtime_error(error, program.source()))),
        }
    }

    fn run_not_found(&self) -> RunReply {
        Err(self
            .registry
            .errors
            .allocate(Diagnostic::not_found("program handle did not resolve")))
    }

    fn reformat(&self, program: ProgramHandle, module: ModuleHandle) -> Option<String> {
        let program = self.registry.programs.resolve(program)?;
        let loaded = self.loader.resolve(module)?;
        program.reformat(loaded.module().as_ref())
    }
}

// =============================================================================
// Service Daemon
// =============================================================================

/// The language service daemon.
///
/// Owns the engine state and receives requests from clients via channel.
/// Runs as a long-lived background task until the shutdown token fires or
/// every sender is dropped.
pub struct ServiceDaemon {
    engine: Arc<Engine>,
    request_rx: mpsc::Receiver<ServiceRequest>,
}

impl ServiceDaemon {
    /// Creates a daemon hosting the built-in modules.
    ///
    /// Returns the daemon and a sender that can be cloned for clients.
    pub fn new(config: &ServiceConfig) -> (Self, mpsc::Sender<ServiceRequest>) {
        Self::with_modules(config, ModuleRegistry::with_builtins())
    }

    /// Creates a daemon hosting a caller-supplied module registry.
    pub fn with_modules(
        config: &ServiceConfig,
        modules: ModuleRegistry,
    ) -> (Self, mpsc::Sender<ServiceRequest>) {
        let (request_tx, request_rx) = mpsc::channel(config.channel_capacity);
        let daemon = Self {
            engine: Arc::new(Engine {
                registry: Registry::new(),
                loader: ModuleLoader::new(modules),
            }),
            request_rx,
        };
        (daemon, request_tx)
    }

    /// Runs the daemon until shutdown is signalled or the request channel
    /// closes.
    ///
    /// Either exit path drains the registry and unloads every module, so a
    /// severed channel cannot leak handles across reconnects.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Language service daemon starting");

        let Self {
            engine,
            mut request_rx,
        } = self;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Language service daemon shutting down");
                    break;
                }

                request = request_rx.recv() => {
                    match request {
                        Some(request) => Self::handle_request(&engine, request),
                        None => {
                            info!("Request channel closed, tearing down");
                            break;
                        }
                    }
                }
            }
        }

        let released = engine.registry.clear();
        let unloaded = engine.loader.clear();
        info!(released, unloaded, "Language service daemon stopped");
    }

    fn handle_request(engine: &Arc<Engine>, request: ServiceRequest) {
        debug!(op = request.name(), "Request received");

        // Replies whose receiver has gone away are dropped silently; the
        // caller abandoned the call.
        match request {
            ServiceRequest::LoadModule { identifier, reply } => {
                let _ = reply.send(engine.loader.load(&identifier));
            }
            ServiceRequest::UnloadModule { handle, reply } => {
                let _ = reply.send(engine.loader.unload(handle));
            }
            ServiceRequest::ListModules { reply } => {
                let _ = reply.send(engine.loader.available_modules());
            }
            ServiceRequest::Parse {
                source,
                origin,
                module,
                reply,
            } => {
                let _ = reply.send(engine.parse(&source, origin, module));
            }
            ServiceRequest::ReleaseProgram { handle, reply } => {
                let _ = reply.send(engine.registry.programs.release(handle));
            }
            ServiceRequest::Highlight { handle, reply } => {
                let blob = engine
                    .registry
                    .programs
                    .resolve(handle)
                    .and_then(|program| program.highlight_blob());
                let _ = reply.send(blob);
            }
            ServiceRequest::PrettyPrint { handle, reply } => {
                let text = engine
                    .registry
                    .programs
                    .resolve(handle)
                    .and_then(|program| program.pretty_print());
                let _ = reply.send(text);
            }
            ServiceRequest::Reformat {
                handle,
                module,
                reply,
            } => {
                let _ = reply.send(engine.reformat(handle, module));
            }
            ServiceRequest::Run {
                handle,
                context,
                reply,
            } => {
                // Execute off the event loop so a slow run never blocks an
                // unrelated request.
                let Some(program) = engine.registry.programs.resolve(handle) else {
                    let _ = reply.send(engine.run_not_found());
                    return;
                };
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    let _ = reply.send(engine.run(&program, &context));
                });
            }
            ServiceRequest::LocateExpression {
                offset,
                program,
                reply,
            } => {
                let handle = engine
                    .registry
                    .programs
                    .resolve(program)
                    .and_then(|program| program.expression_at(offset))
                    .map(|expression| engine.registry.expressions.allocate(expression));
                let _ = reply.send(handle);
            }
            ServiceRequest::DescribeExpressionKind { handle, reply } => {
                let name = engine
                    .registry
                    .expressions
                    .resolve(handle)
                    .map(|expression| expression.kind_name().to_string());
                let _ = reply.send(name);
            }
            ServiceRequest::DescribeExpressionKindDetail { handle, reply } => {
                let detail = engine
                    .registry
                    .expressions
                    .resolve(handle)
                    .map(|expression| expression.kind_description().to_string());
                let _ = reply.send(detail);
            }
            ServiceRequest::ReleaseExpression { handle, reply } => {
                let _ = reply.send(engine.registry.expressions.release(handle));
            }
            ServiceRequest::DescribeObject { handle, reply } => {
                let description = engine
                    .registry
                    .objects
                    .resolve(handle)
                    .map(|object| object.description().to_string());
                let _ = reply.send(description);
            }
            ServiceRequest::ReleaseObject { handle, reply } => {
                let _ = reply.send(engine.registry.objects.release(handle));
            }
            ServiceRequest::MaterializeError { handle, reply } => {
                let error = engine
                    .registry
                    .errors
                    .resolve(handle)
                    .map(|diagnostic| diagnostic.materialize());
                let _ = reply.send(error);
            }
            ServiceRequest::ReleaseError { handle, reply } => {
                let _ = reply.send(engine.registry.errors.release(handle));
            }
            ServiceRequest::LineRange {
                handle,
                source,
                reply,
            } => {
                let range = engine
                    .registry
                    .errors
                    .resolve(handle)
                    .and_then(|diagnostic| diagnostic.line_range(&source));
                let _ = reply.send(range);
            }
            ServiceRequest::ColumnRange {
                handle,
                source,
                reply,
            } => {
                let range = engine
                    .registry
                    .errors
                    .resolve(handle)
                    .and_then(|diagnostic| diagnostic.column_range(&source));
                let _ = reply.send(range);
            }
            ServiceRequest::CharacterRange {
                handle,
                source,
                reply,
            } => {
                let range = engine
                    .registry
                    .errors
                    .resolve(handle)
                    .and_then(|diagnostic| diagnostic.character_range(&source));
                let _ = reply.send(range);
            }
            ServiceRequest::FixesForError { handle, reply } => {
                let fixes = match engine.registry.errors.resolve(handle) {
                    Some(diagnostic) => diagnostic
                        .fixes()
                        .iter()
                        .map(|fix| engine.registry.fixes.allocate(fix.clone()))
                        .collect(),
                    None => Vec::new(),
                };
                let _ = reply.send(fixes);
            }
            ServiceRequest::ContextualFixDescriptions {
                source,
                fixes,
                reply,
            } => {
                let descriptions = fixes
                    .iter()
                    .map(|&fix| match engine.registry.fixes.resolve(fix) {
                        Some(fix) => fix.contextual_description(&source),
                        None => String::new(),
                    })
                    .collect();
                let _ = reply.send(descriptions);
            }
            ServiceRequest::SimpleFixDescriptions {
                source,
                fixes,
                reply,
            } => {
                let descriptions = fixes
                    .iter()
                    .map(|&fix| match engine.registry.fixes.resolve(fix) {
                        Some(fix) => fix.simple_description(&source),
                        None => String::new(),
                    })
                    .collect();
                let _ = reply.send(descriptions);
            }
            ServiceRequest::ApplyFix { fix, source, reply } => {
                let corrected = engine
                    .registry
                    .fixes
                    .resolve(fix)
                    .and_then(|fix| fix.apply(&source));
                let _ = reply.send(corrected);
            }
        }
    }
}
