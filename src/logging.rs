//! Log file resolution and the process-wide logging context.
//!
//! A [`LoggingContext`] owns one subscriber whose output and filter can be swapped.
//! Until a run attaches its log file the output is the fallback (stderr, or
//! nothing); while a [`LogSink`] is alive every thread logs into the file.
use std::{
    fmt::{self, Write as _},
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{Local, Utc};
use nix::unistd::{AccessFlags, access};
use tracing::{
    Dispatch, Event, Subscriber,
    dispatcher::{self, DefaultGuard, SetGlobalDefaultError},
    field::{Field, Visit},
    level_filters::LevelFilter,
    warn,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self as tracing_fmt, FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::{Identity, Layered, SubscriberExt},
    registry::LookupSpan,
    reload,
};

/// File name used when no usable log file is configured.
pub const DEFAULT_LOG_FILE: &str = "template.log";

/// Threshold of the run's log file.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Field that promotes an ERROR event to `CRITICAL` in the log file.
pub const CRITICAL_FIELD: &str = "critical";

const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
const MARKER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;
type OutputLayer = reload::Layer<BoxedLayer, Registry>;
type OutputHandle = reload::Handle<BoxedLayer, Registry>;
type FilterHandle = reload::Handle<EnvFilter, Layered<OutputLayer, Registry>>;

/// Chooses the log file for a run.
///
/// A missing setting silently yields `<working_dir>/template.log`. A setting
/// that is not writable logs a warning and yields the same default, whether or
/// not the default is itself writable.
pub fn resolve_log_file(configured: Option<&Path>, working_dir: &Path) -> PathBuf {
    let fallback = working_dir.join(DEFAULT_LOG_FILE);
    let Some(configured) = configured else {
        return fallback;
    };

    let candidate = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        working_dir.join(configured)
    };

    if is_writable(&candidate) {
        candidate
    } else {
        warn!(
            "No write access to {}, put log file into current working directory",
            candidate.display()
        );
        fallback
    }
}

/// Whether the current process may write to `path`.
///
/// Missing files count as writable when their parent directory is.
pub fn is_writable(path: &Path) -> bool {
    if path.exists() {
        return !path.is_dir() && access(path, AccessFlags::W_OK).is_ok();
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.is_dir() && access(parent, AccessFlags::W_OK).is_ok()
}

/// UTC wall-clock timestamp used in the START/END markers.
pub fn marker_timestamp() -> String {
    Utc::now().format(MARKER_TIMESTAMP_FORMAT).to_string()
}

/// Renders a duration as `H:MM:SS.ffffff`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    let seconds = micros / 1_000_000;
    format!(
        "{}:{:02}:{:02}.{:06}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60,
        micros % 1_000_000
    )
}

#[derive(Default)]
struct LineFields {
    message: String,
    extra: String,
    critical: bool,
}

impl Visit for LineFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.extra, " {}={value:?}", field.name());
        }
    }
}

/// Formats events as `<timestamp> <LEVEL> <target> <message>`.
///
/// Events carrying `critical = true` are rendered with the `CRITICAL` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        let metadata = event.metadata();
        let timestamp = Local::now().format(LINE_TIMESTAMP_FORMAT);
        if fields.critical {
            write!(writer, "{timestamp} CRITICAL ")?;
        } else {
            write!(writer, "{timestamp} {} ", metadata.level())?;
        }
        writeln!(
            writer,
            "{} {}{}",
            metadata.target(),
            fields.message,
            fields.extra
        )
    }
}

/// Where events go while no log file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    /// Discard events.
    Silent,
    /// Write to stderr, filtered by `RUST_LOG` or `warn`.
    Console,
}

impl Fallback {
    fn filter(self) -> EnvFilter {
        match self {
            Fallback::Silent => EnvFilter::new("off"),
            Fallback::Console => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
            }
        }
    }

    fn layer(self) -> BoxedLayer {
        match self {
            Fallback::Silent => Box::new(Identity::new()),
            Fallback::Console => tracing_fmt::layer().with_writer(io::stderr).boxed(),
        }
    }
}

/// The two swappable parts of the subscriber.
#[derive(Clone)]
struct Slots {
    output: OutputHandle,
    filter: FilterHandle,
}

impl Slots {
    fn swap(&self, layer: BoxedLayer, filter: EnvFilter) -> Result<(), reload::Error> {
        self.output.reload(layer)?;
        self.filter.reload(filter)
    }

    fn restore(&self, fallback: Fallback) -> Result<(), reload::Error> {
        self.filter.reload(fallback.filter())?;
        self.output.reload(fallback.layer())
    }
}

/// The logging state of the process, created once at start-up.
///
/// Cloning shares the same subscriber and slots.
#[derive(Clone)]
pub struct LoggingContext {
    dispatch: Dispatch,
    slots: Slots,
    fallback: Fallback,
}

impl LoggingContext {
    /// Context whose fallback output is stderr.
    pub fn console() -> Self {
        Self::with_fallback(Fallback::Console)
    }

    /// Context that discards events while no log file is attached.
    pub fn silent() -> Self {
        Self::with_fallback(Fallback::Silent)
    }

    fn with_fallback(fallback: Fallback) -> Self {
        let (output, output_handle) = reload::Layer::new(fallback.layer());
        let (filter, filter_handle) = reload::Layer::new(fallback.filter());
        let dispatch = Dispatch::new(Registry::default().with(output).with(filter));
        Self {
            dispatch,
            slots: Slots {
                output: output_handle,
                filter: filter_handle,
            },
            fallback,
        }
    }

    /// Makes this context the subscriber of every thread in the process.
    pub fn init_global(&self) -> Result<(), SetGlobalDefaultError> {
        dispatcher::set_global_default(self.dispatch.clone())
    }

    /// Makes this context the subscriber of the current thread only.
    pub fn enter(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    /// Truncates `path` and routes events at or above `level` into it.
    ///
    /// The fallback output is suspended until the returned sink is released.
    pub fn attach_file(&self, path: &Path, level: LevelFilter) -> io::Result<LogSink> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let (writer, worker) = tracing_appender::non_blocking(file);

        let layer = tracing_fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .event_format(LineFormat)
            .boxed();
        let filter = EnvFilter::default().add_directive(level.into());
        self.slots.swap(layer, filter).map_err(io::Error::other)?;

        Ok(LogSink {
            path: path.to_path_buf(),
            level,
            slots: self.slots.clone(),
            fallback: self.fallback,
            _worker: worker,
        })
    }
}

impl fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingContext")
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// The log file of a single run.
///
/// Dropping the sink, or calling [`LogSink::shutdown`], restores the fallback
/// output and flushes every buffered line to disk.
pub struct LogSink {
    path: PathBuf,
    level: LevelFilter,
    slots: Slots,
    fallback: Fallback,
    _worker: WorkerGuard,
}

impl LogSink {
    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Minimum severity written to the file.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Detaches the sink and flushes pending lines.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        // The worker guard is dropped after this body, once the file layer
        // holding the writer is gone.
        let _ = self.slots.restore(self.fallback);
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("path", &self.path)
            .field("level", &self.level)
            .finish()
    }
}
