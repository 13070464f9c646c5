//! Error handling for the application template.
use std::path::PathBuf;

use thiserror::Error;

/// Exit code used when the run never reached the entry point.
pub const EXIT_SETUP_FAILURE: i32 = 1;

/// Exit code used when the entry point failed or panicked.
pub const EXIT_APPLICATION_FAILURE: i32 = 3;

/// Errors raised while loading or querying the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading or accessing a configuration file.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// The configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Error parsing INI syntax.
    #[error("Invalid INI format: {0}")]
    Parse(#[from] ini::ParseError),

    /// Options were declared before any `[section]` header.
    #[error("File contains no section headers (first option: '{key}')")]
    MissingSectionHeader {
        /// The first option found outside a section.
        key: String,
    },

    /// The requested section does not exist.
    #[error("No section: '{0}'")]
    NoSection(String),

    /// The requested option does not exist in the section.
    #[error("No option '{key}' in section: '{section}'")]
    NoOption {
        /// Section that was searched.
        section: String,
        /// Missing option name.
        key: String,
    },

    /// A `%` in a value was neither `%%` nor `%(name)s`.
    #[error("Bad interpolation syntax in option '{key}' of section '{section}': '{value}'")]
    InterpolationSyntax {
        /// Section holding the option.
        section: String,
        /// Option whose value is malformed.
        key: String,
        /// The raw value.
        value: String,
    },

    /// A `%(name)s` reference points at an option that does not exist.
    #[error(
        "Option '{key}' in section '{section}' references missing option '{reference}'"
    )]
    InterpolationMissing {
        /// Section holding the option.
        section: String,
        /// Option containing the reference.
        key: String,
        /// The name that could not be resolved.
        reference: String,
    },

    /// References nest too deeply, usually because of a cycle.
    #[error("Interpolation of option '{key}' in section '{section}' exceeds depth {depth}")]
    InterpolationDepth {
        /// Section holding the option.
        section: String,
        /// Option being resolved.
        key: String,
        /// Maximum depth allowed.
        depth: usize,
    },
}

/// Failure reported by the application entry point.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Generic failure with a message.
    #[error("{0}")]
    Failed(String),

    /// I/O error raised by the application logic.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command needed by the application failed.
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),
}

/// Failure reasons for the command runner.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The argument vector was empty.
    #[error("No command given")]
    EmptyCommand,

    /// The program could not be found on the search path.
    #[error("The command '{program}' could not be found")]
    NotFound {
        /// The program name that was looked up.
        program: String,
    },

    /// The program exists but could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// The program name.
        program: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited abnormally.
    #[error("The subprocess failed with: output = {output}, error code = {code:?}")]
    Execution {
        /// Exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        /// Captured merged output.
        output: String,
    },

    /// The merged output was not valid UTF-8.
    #[error("Output of '{program}' is not valid UTF-8: {source}")]
    Decode {
        /// The program name.
        program: String,
        /// The underlying decoding error.
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Reading the output pipe or waiting on the child failed.
    #[error("I/O error while running '{program}': {source}")]
    Io {
        /// The program name.
        program: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Fatal failures of a lifecycle run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The configuration could not be loaded.
    #[error("Cannot open configuration file: [{0}]")]
    Config(#[from] ConfigError),

    /// The working directory could not be determined.
    #[error("Cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// The log file could not be opened.
    #[error("Cannot open log file {path}: {source}")]
    LogSink {
        /// The resolved log file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The entry point returned an error.
    #[error("Execution failed: {0}")]
    Application(#[from] ApplicationError),

    /// The entry point panicked.
    #[error("Execution panicked: {0}")]
    Panicked(String),
}

impl LifecycleError {
    /// Process exit code associated with this failure.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::WorkingDir(_) | Self::LogSink { .. } => {
                EXIT_SETUP_FAILURE
            }
            Self::Application(_) | Self::Panicked(_) => EXIT_APPLICATION_FAILURE,
        }
    }
}
