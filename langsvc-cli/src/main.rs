//! langsvc CLI - Command-line interface
//!
//! This binary drives the language service end-to-end: parse, run, and
//! reformat scripts with the built-in language modules.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use error::CliError;

#[derive(Parser)]
#[command(name = "langsvc")]
#[command(version = langsvc::VERSION)]
#[command(about = "Parse, run, and reformat scripts via the language service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and execute a script, printing the result
    Run(commands::run::RunArgs),
    /// Parse a script and report diagnostics without running it
    Check(commands::check::CheckArgs),
    /// Reformat a script, optionally into another dialect
    Fmt(commands::fmt::FmtArgs),
    /// List the available language modules
    Modules,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Keep the guard alive for the whole invocation.
    let _logging = match langsvc::logging::init_logging(
        langsvc::logging::default_log_dir(),
        langsvc::logging::default_log_file(),
    ) {
        Ok(guard) => guard,
        Err(error) => CliError::LoggingInit(error).exit(),
    };
    tracing::info!(version = langsvc::VERSION, "langsvc CLI starting");

    let result = match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::Check(args) => commands::check::run(args).await,
        Command::Fmt(args) => commands::fmt::run(args).await,
        Command::Modules => commands::modules::run().await,
    };

    if let Err(error) = result {
        error.exit();
    }
}
