//! The service façade: daemon, client, and request plumbing.
//!
//! This is the single entry point to the engine. Hosts spawn a
//! [`ServiceDaemon`] (usually via [`Service::spawn`]) and hand out
//! [`ServiceClient`] clones; everything the engine can do is reachable
//! through the client's async call surface, and every engine object crosses
//! the boundary as an opaque handle.

mod client;
mod daemon;
mod error;
mod request;

pub use client::ServiceClient;
pub use daemon::ServiceDaemon;
pub use error::ClientError;
pub use request::{ParseReply, RunReply, ServiceRequest};

use crate::config::ServiceConfig;
use crate::language::ModuleRegistry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Convenience entry point for hosting the service.
pub struct Service;

impl Service {
    /// Spawns a daemon with the built-in modules on the current runtime.
    ///
    /// Returns a client, the shutdown token, and the daemon's join handle.
    /// Cancelling the token (or dropping every client) stops the daemon and
    /// drains everything it allocated.
    pub fn spawn(config: &ServiceConfig) -> (ServiceClient, CancellationToken, JoinHandle<()>) {
        Self::spawn_with_modules(config, ModuleRegistry::with_builtins())
    }

    /// Spawns a daemon hosting a caller-supplied module registry.
    pub fn spawn_with_modules(
        config: &ServiceConfig,
        modules: ModuleRegistry,
    ) -> (ServiceClient, CancellationToken, JoinHandle<()>) {
        let (daemon, request_tx) = ServiceDaemon::with_modules(config, modules);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(daemon.run(shutdown.clone()));
        (ServiceClient::new(request_tx), shutdown, handle)
    }
}
