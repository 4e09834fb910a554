//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`run`] - Parse and execute a script
//! - [`check`] - Parse only, reporting diagnostics and fixes
//! - [`fmt`] - Reformat a script, optionally across dialects
//! - [`modules`] - List available language modules

pub mod check;
pub mod common;
pub mod fmt;
pub mod modules;
pub mod run;
