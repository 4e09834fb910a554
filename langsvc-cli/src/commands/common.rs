//! Shared plumbing for CLI commands.

use crate::error::CliError;
use langsvc::config::ServiceConfig;
use langsvc::language::ModuleHandle;
use langsvc::registry::ErrorHandle;
use langsvc::service::{Service, ServiceClient};
use std::fs;
use tokio_util::sync::CancellationToken;

/// A running service instance scoped to one CLI invocation.
pub struct ServiceSession {
    client: ServiceClient,
    shutdown: CancellationToken,
}

impl ServiceSession {
    /// Spawns an in-process service with the built-in modules.
    pub fn start() -> Self {
        let (client, shutdown, _handle) = Service::spawn(&ServiceConfig::default());
        Self { client, shutdown }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Loads a module, mapping an absent handle to a friendly error.
    pub async fn load_module(&self, identifier: &str) -> Result<ModuleHandle, CliError> {
        self.client
            .load_module(identifier)
            .await?
            .ok_or_else(|| CliError::UnknownModule(identifier.to_string()))
    }

    /// Stops the daemon.
    pub fn finish(self) {
        self.shutdown.cancel();
    }
}

/// Reads a script file.
pub fn read_source(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|error| CliError::FileRead {
        path: path.to_string(),
        error,
    })
}

/// Prints a diagnostic with its location and ranked fixes.
pub async fn report_diagnostic(
    client: &ServiceClient,
    error: ErrorHandle,
    source: &str,
) -> Result<(), CliError> {
    let Some(canonical) = client.materialize_error(error).await? else {
        eprintln!("error: diagnostic no longer available");
        return Ok(());
    };
    eprintln!("error: {}", canonical.message);
    eprintln!("  [{} code {}]", canonical.domain, canonical.code);

    if let (Some(lines), Some(columns)) = (
        client.line_range(error, source).await?,
        client.column_range(error, source).await?,
    ) {
        // One-based for display.
        eprintln!("  at line {}, column {}", lines.start + 1, columns.start + 1);
    }

    let fixes = client.fixes_for_error(error).await?;
    if fixes.is_empty() {
        return Ok(());
    }

    let descriptions = client
        .contextual_fix_descriptions(source, fixes.clone())
        .await?;
    eprintln!();
    eprintln!("suggested fixes (best first):");
    for (fix, description) in fixes.iter().zip(&descriptions) {
        if description.is_empty() {
            continue;
        }
        match client.apply_fix(*fix, source).await? {
            Some(corrected) => eprintln!("  - {}: {}", description, corrected),
            None => eprintln!("  - {}", description),
        }
    }
    Ok(())
}
