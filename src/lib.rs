//! A skeleton for command-line applications. It parses the command line,
//! loads an INI configuration file, attaches a log file, and runs the
//! application entry point between START and END markers before exiting with
//! the entry point's status.

/// Application entry point.
pub mod app;

/// CLI interface.
pub mod cli;

/// External command runner.
pub mod command;

/// Configuration management.
pub mod config;

/// Error handling.
pub mod error;

/// Start-up and shutdown wrapper.
pub mod lifecycle;

/// Log file resolution and sink.
pub mod logging;
