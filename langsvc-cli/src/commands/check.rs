//! Check command - parse a script and report diagnostics without running it.

use super::common::{read_source, report_diagnostic, ServiceSession};
use crate::error::CliError;
use clap::Args;
use langsvc::source::SourceOrigin;

/// Arguments for the check command.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Script file to check
    pub file: String,

    /// Language module to parse with
    #[arg(long, default_value = "lang.calc")]
    pub module: String,
}

/// Run the check command.
pub async fn run(args: CheckArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let session = ServiceSession::start();
    let client = session.client();

    let module = session.load_module(&args.module).await?;
    let origin = Some(SourceOrigin::new(&args.file));

    match client.parse(&source, origin, module).await? {
        Ok(program) => {
            println!("{}: no errors", args.file);
            let _ = client.release_program(program).await?;
            session.finish();
            Ok(())
        }
        Err(error) => {
            report_diagnostic(client, error, &source).await?;
            session.finish();
            Err(CliError::ScriptFailed)
        }
    }
}
