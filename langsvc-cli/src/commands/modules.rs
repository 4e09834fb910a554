//! Modules command - list the modules the service can load.

use super::common::ServiceSession;
use crate::error::CliError;

/// Run the modules command.
pub async fn run() -> Result<(), CliError> {
    let session = ServiceSession::start();

    let modules = session.client().list_modules().await?;
    if modules.is_empty() {
        println!("No language modules available.");
    } else {
        let width = modules
            .iter()
            .map(|m| m.identifier.len())
            .max()
            .unwrap_or(0);
        for module in &modules {
            println!("{:width$}  {}", module.identifier, module.name);
        }
    }

    session.finish();
    Ok(())
}
