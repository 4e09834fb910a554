//! langsvc - A handle-based language service
//!
//! This library hosts pluggable language modules behind an asynchronous
//! request/reply boundary: clients load modules by identifier, parse source
//! text into programs, run programs, and inspect diagnostics with applicable
//! source fixes — all through opaque handles, never direct references.
//!
//! # High-Level API
//!
//! The [`service`] module is the entry point:
//!
//! ```ignore
//! use langsvc::config::ServiceConfig;
//! use langsvc::language::RunContext;
//! use langsvc::service::Service;
//!
//! let (client, shutdown, _daemon) = Service::spawn(&ServiceConfig::default());
//!
//! let module = client.load_module("lang.calc").await?.unwrap();
//! let program = client.parse("1 + 2", None, module).await?.unwrap();
//! let object = client.run(program, RunContext::default()).await?.unwrap();
//! assert_eq!(client.describe_object(object).await?.as_deref(), Some("3"));
//!
//! shutdown.cancel();
//! ```

pub mod config;
pub mod diagnostics;
pub mod language;
pub mod logging;
pub mod program;
pub mod registry;
pub mod service;
pub mod source;
pub mod styled;

/// Version of the langsvc library and CLI.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
