//! Run command - parse and execute a script, printing the result.

use super::common::{read_source, report_diagnostic, ServiceSession};
use crate::error::CliError;
use clap::Args;
use langsvc::language::RunContext;
use langsvc::source::SourceOrigin;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Script file to execute
    pub file: String,

    /// Language module to parse with
    #[arg(long, default_value = "lang.calc")]
    pub module: String,

    /// Display name passed to the script's runtime
    #[arg(long)]
    pub script_name: Option<String>,

    /// Ambient application identifier passed to the script's runtime
    #[arg(long)]
    pub application: Option<String>,
}

/// Run the run command.
pub async fn run(args: RunArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let session = ServiceSession::start();
    let client = session.client();

    let module = session.load_module(&args.module).await?;
    let origin = Some(SourceOrigin::new(&args.file));

    let program = match client.parse(&source, origin, module).await? {
        Ok(program) => program,
        Err(error) => {
            report_diagnostic(client, error, &source).await?;
            session.finish();
            return Err(CliError::ScriptFailed);
        }
    };

    let context = RunContext {
        script_name: args.script_name.or_else(|| Some(args.file.clone())),
        current_application: args.application,
    };
    match client.run(program, context).await? {
        Ok(object) => {
            if let Some(description) = client.describe_object(object).await? {
                println!("{}", description);
            }
        }
        Err(error) => {
            report_diagnostic(client, error, &source).await?;
            session.finish();
            return Err(CliError::ScriptFailed);
        }
    }

    session.finish();
    Ok(())
}
