//! Fmt command - reformat a script, optionally into another dialect.

use super::common::{read_source, report_diagnostic, ServiceSession};
use crate::error::CliError;
use clap::Args;
use langsvc::source::SourceOrigin;

/// Arguments for the fmt command.
#[derive(Debug, Args)]
pub struct FmtArgs {
    /// Script file to reformat
    pub file: String,

    /// Language module to parse with
    #[arg(long, default_value = "lang.calc")]
    pub module: String,

    /// Render in a different module's dialect (e.g. lang.calc.words)
    #[arg(long)]
    pub dialect: Option<String>,
}

/// Run the fmt command.
pub async fn run(args: FmtArgs) -> Result<(), CliError> {
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

    let formatted = match &args.dialect {
        Some(dialect) => {
            let target = session.load_module(dialect).await?;
            client.reformat(program, target).await?
        }
        None => client.pretty_print(program).await?,
    };

    session.finish();
    match formatted {
        Some(text) => {
            println!("{}", text);
            Ok(())
        }
        None => Err(CliError::ScriptFailed),
    }
}
