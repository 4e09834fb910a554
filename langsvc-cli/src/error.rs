//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use langsvc::service::ClientError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Failed to read a script file
    FileRead { path: String, error: std::io::Error },
    /// The requested language module is unknown or unloadable
    UnknownModule(String),
    /// The service channel failed
    Service(ClientError),
    /// The script was parsed or run and produced diagnostics (already
    /// reported to the user)
    ScriptFailed,
}

impl CliError {
    /// Exit code for this error.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::ScriptFailed => 1,
            CliError::FileRead { .. } | CliError::UnknownModule(_) => 2,
            CliError::LoggingInit(_) | CliError::Service(_) => 3,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        // Script diagnostics were already printed in full.
        if !matches!(self, CliError::ScriptFailed) {
            eprintln!("Error: {}", self);
        }

        if let CliError::UnknownModule(_) = self {
            eprintln!();
            eprintln!("Run 'langsvc modules' to list the available modules.");
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read '{}': {}", path, error)
            }
            CliError::UnknownModule(identifier) => {
                write!(f, "No language module named '{}'", identifier)
            }
            CliError::Service(e) => write!(f, "Service error: {}", e),
            CliError::ScriptFailed => write!(f, "script contains errors"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::Service(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        CliError::Service(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::ScriptFailed.exit_code(), 1);
        assert_eq!(CliError::UnknownModule("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Service(ClientError::ChannelClosed).exit_code(),
            3
        );
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CliError::UnknownModule("lang.nope".into()).to_string(),
            "No language module named 'lang.nope'"
        );
        assert!(CliError::Service(ClientError::ChannelClosed)
            .to_string()
            .contains("shut down"));
    }
}
