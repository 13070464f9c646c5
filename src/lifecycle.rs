//! Start-up and shutdown wrapper around the application entry point.
//!
//! A run moves through `INIT -> CONFIG_LOADED -> LOGGING_READY -> RUNNING ->
//! {SUCCESS | FAILED} -> TERMINATED`. Whatever happens along the way, the
//! [`ExecutionRecord`] guard writes the END marker exactly once and releases
//! the log sink afterwards.
use std::{
    any::Any,
    backtrace::Backtrace,
    env,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use strum_macros::{AsRefStr, Display};
use tracing::{debug, error};

use crate::{
    config::Config,
    error::{ApplicationError, EXIT_SETUP_FAILURE, LifecycleError},
    logging::{self, LogSink, LoggingContext},
};

/// Stages of a lifecycle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Init,
    ConfigLoaded,
    LoggingReady,
    Running,
    Success,
    Failed,
    Terminated,
}

/// What a finished run looked like.
#[derive(Debug)]
pub struct RunReport {
    /// Exit code the process should terminate with.
    pub exit_code: i32,
    /// Last state reached before termination.
    pub state: LifecycleState,
    /// Wall-clock time spent between the start and end markers.
    pub elapsed: Duration,
    /// UTC time the run began.
    pub started_at: DateTime<Utc>,
    /// UTC time the run ended.
    pub finished_at: DateTime<Utc>,
    /// Log file the run wrote to, if logging was set up.
    pub log_file: Option<PathBuf>,
    /// The fatal failure, if any.
    pub failure: Option<LifecycleError>,
}

/// Scoped record of one run.
///
/// Finalization happens either through [`ExecutionRecord::finish`] or when the
/// record is dropped, and never more than once.
#[derive(Debug)]
pub struct ExecutionRecord {
    state: LifecycleState,
    started: Instant,
    started_at: DateTime<Utc>,
    exit_code: i32,
    failure: Option<LifecycleError>,
    sink: Option<LogSink>,
    finalized: bool,
}

impl ExecutionRecord {
    /// Opens a record in the `INIT` state.
    pub fn begin() -> Self {
        Self {
            state: LifecycleState::Init,
            started: Instant::now(),
            started_at: Utc::now(),
            exit_code: EXIT_SETUP_FAILURE,
            failure: None,
            sink: None,
            finalized: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!("lifecycle {} -> {}", self.state, next);
        self.state = next;
    }

    fn attach_sink(&mut self, sink: LogSink) {
        self.sink = Some(sink);
    }

    /// Restarts the clock and writes the START marker.
    fn mark_started(&mut self) {
        self.started = Instant::now();
        self.started_at = Utc::now();
        error!(
            critical = true,
            "=== START OF APPLICATION AT {} ===",
            logging::marker_timestamp()
        );
    }

    fn succeed(&mut self, exit_code: i32) {
        self.exit_code = exit_code;
        self.transition(LifecycleState::Success);
    }

    fn fail(&mut self, failure: LifecycleError) {
        error!("{failure}\n{}", Backtrace::force_capture());
        self.exit_code = failure.exit_code();
        self.failure = Some(failure);
        if self.state == LifecycleState::Running {
            self.transition(LifecycleState::Failed);
        }
    }

    /// Finalizes the run and returns its report.
    pub fn finish(mut self) -> RunReport {
        self.finalize()
    }

    fn finalize(&mut self) -> RunReport {
        self.finalized = true;
        let elapsed = self.started.elapsed();
        error!(
            critical = true,
            "=== END OF APPLICATION AT {} ({}) ===",
            logging::marker_timestamp(),
            logging::format_elapsed(elapsed)
        );

        let state = self.state;
        self.transition(LifecycleState::Terminated);
        let log_file = self.sink.as_ref().map(|sink| sink.path().to_path_buf());
        if let Some(sink) = self.sink.take() {
            sink.shutdown();
        }

        RunReport {
            exit_code: self.exit_code,
            state,
            elapsed,
            started_at: self.started_at,
            finished_at: Utc::now(),
            log_file,
            failure: self.failure.take(),
        }
    }
}

impl Drop for ExecutionRecord {
    fn drop(&mut self) {
        if !self.finalized {
            self.finalize();
        }
    }
}

/// Loads configuration, attaches logging, and runs an entry point.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    config_path: PathBuf,
    working_dir: Option<PathBuf>,
    logging: LoggingContext,
}

impl Lifecycle {
    /// Creates a lifecycle reading configuration from `config_path`.
    ///
    /// The run's log file is attached to `logging` and detached again when
    /// the run ends.
    pub fn new(config_path: impl Into<PathBuf>, logging: LoggingContext) -> Self {
        Self {
            config_path: config_path.into(),
            working_dir: None,
            logging,
        }
    }

    /// Directory used for the default log file and relative log paths.
    ///
    /// Defaults to the process working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Path of the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Executes one run and returns its report.
    pub fn run<F>(&self, entry: F) -> RunReport
    where
        F: FnOnce(&Config) -> Result<i32, ApplicationError>,
    {
        let mut record = ExecutionRecord::begin();
        match self.execute(&mut record, entry) {
            Ok(exit_code) => record.succeed(exit_code),
            Err(failure) => record.fail(failure),
        }
        record.finish()
    }

    fn execute<F>(&self, record: &mut ExecutionRecord, entry: F) -> Result<i32, LifecycleError>
    where
        F: FnOnce(&Config) -> Result<i32, ApplicationError>,
    {
        let config = Config::load(&self.config_path)?;
        record.transition(LifecycleState::ConfigLoaded);

        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir().map_err(LifecycleError::WorkingDir)?,
        };
        let configured = config.log_file()?;
        let log_file = logging::resolve_log_file(configured.as_deref(), &working_dir);

        let sink = self
            .logging
            .attach_file(&log_file, logging::DEFAULT_LOG_LEVEL)
            .map_err(|source| LifecycleError::LogSink {
                path: log_file.clone(),
                source,
            })?;
        record.attach_sink(sink);
        record.transition(LifecycleState::LoggingReady);

        record.mark_started();
        record.transition(LifecycleState::Running);

        match panic::catch_unwind(AssertUnwindSafe(|| entry(&config))) {
            Ok(result) => Ok(result?),
            Err(payload) => Err(LifecycleError::Panicked(panic_message(&*payload))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
