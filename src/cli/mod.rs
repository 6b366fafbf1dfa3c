// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for running sessions.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! logging macros and the `run` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Logging macros and verbosity.
pub mod logging;

/// Session command.
pub mod run;
