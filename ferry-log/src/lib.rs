//! Logging setup for ferry.
//!
//! Libraries in the workspace log through `tracing` macros with structured
//! fields; this crate only decides where those events go. Call [`init`] once
//! from the binary and keep the returned [`LogGuard`] alive until exit.
//!
//! ```no_run
//! use ferry_log::{LogConfig, init};
//!
//! let config = LogConfig::from_env().with_log_dir("./logs").with_verbose(true);
//! let _guard = init(&config).unwrap();
//! tracing::info!(storage_type = "minio", "Server starting");
//! ```
//!
//! # Environment Variables
//!
//! - `FERRY_DEBUG=1` - Enable debug logging
//! - `FERRY_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `FERRY_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `FERRY_LOG_DIR=<path>` - Write `app.log` into this directory
//!
//! `RUST_LOG`, when set, replaces the level-derived filter.

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self as tracing_fmt, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// File name written under the log directory.
pub const LOG_FILE_NAME: &str = "app.log";

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log directory could not be created.
    #[error("Cannot create log directory {path}: {source}")]
    Directory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The log file could not be opened.
    #[error("Cannot open log file: {0}")]
    File(String),

    /// The filter directive did not parse.
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber was already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// No logging
    Off,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Multi-line, human oriented
    Pretty,
    /// Single line text
    Compact,
    /// One JSON object per event
    #[default]
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: Level,
    /// Output format for every sink.
    pub format: Format,
    /// Directory receiving `app.log`; `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to stderr even when a log directory is set.
    pub console: bool,
    /// ANSI colors on the console sink.
    pub colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            log_dir: None,
            console: false,
            colors: false,
        }
    }
}

impl LogConfig {
    /// Create the default configuration (info, JSON, console).
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from `FERRY_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("FERRY_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = lookup("FERRY_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("FERRY_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or_default();

        let log_dir = lookup("FERRY_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            level,
            format,
            log_dir,
            ..Self::default()
        }
    }

    /// Set the minimum level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Write `app.log` into `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Enable or disable ANSI colors on the console.
    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Verbose mode lowers the level to at least debug and mirrors to stderr.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = self.level.min(Level::Debug);
            self.console = true;
        }
        self
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn filter_directive(&self) -> &'static str {
        self.level.as_str()
    }

    /// Whether events reach stderr.
    pub fn console_enabled(&self) -> bool {
        self.console || self.log_dir.is_none()
    }

    /// Full path of the log file, when file logging is on.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.filter_directive())
                .map_err(|e| LogError::Filter(e.to_string())),
        }
    }
}

/// Keeps the background writers alive; dropping it flushes pending events.
#[must_use = "dropping the guard stops log output"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogGuard {
    /// File events are appended to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

impl fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGuard")
            .field("writers", &self._guards.len())
            .field("log_file", &self.log_file)
            .finish()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn format_layer<W>(format: Format, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = tracing_fmt::layer().with_writer(writer).with_target(true);
    match format {
        Format::Json => layer.json().flatten_event(true).boxed(),
        Format::Pretty => layer.pretty().with_ansi(ansi).boxed(),
        Format::Compact => layer.compact().with_ansi(ansi).boxed(),
    }
}

/// Install the global subscriber.
///
/// Fails if the log directory cannot be created or a subscriber is already
/// installed.
pub fn init(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = Vec::new();

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir).map_err(|source| LogError::Directory {
            path: dir.clone(),
            source,
        })?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_NAME)
            .build(dir)
            .map_err(|e| LogError::File(e.to_string()))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(config.format, writer, false));
        guards.push(guard);
    }

    if config.console_enabled() {
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());
        layers.push(format_layer(config.format, writer, config.colors));
        guards.push(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

    Ok(LogGuard {
        _guards: guards,
        log_file: config.log_file(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("invalid"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.filter_directive(), "info");
        assert!(config.console_enabled());
        assert_eq!(config.log_file(), None);
    }

    #[test]
    fn test_debug_flag_sets_level() {
        let config = LogConfig::from_lookup(lookup(&[("FERRY_DEBUG", "true")]));
        assert_eq!(config.level, Level::Debug);

        let config = LogConfig::from_lookup(lookup(&[
            ("FERRY_DEBUG", "1"),
            ("FERRY_LOG_LEVEL", "warn"),
        ]));
        assert_eq!(config.level, Level::Warn);
    }

    #[test]
    fn test_unknown_values_keep_defaults() {
        let config = LogConfig::from_lookup(lookup(&[
            ("FERRY_LOG_LEVEL", "loud"),
            ("FERRY_LOG_FORMAT", "xml"),
            ("FERRY_LOG_DIR", "  "),
        ]));
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_log_dir_is_file_only_unless_verbose() {
        let config = LogConfig::from_lookup(lookup(&[("FERRY_LOG_DIR", "/var/log/ferry")]));
        assert!(!config.console_enabled());
        assert_eq!(
            config.log_file(),
            Some(PathBuf::from("/var/log/ferry/app.log"))
        );

        let verbose = config.with_verbose(true);
        assert!(verbose.console_enabled());
        assert_eq!(verbose.level, Level::Debug);
    }

    #[test]
    fn test_verbose_keeps_finer_level() {
        let config = LogConfig::new().with_level(Level::Trace).with_verbose(true);
        assert_eq!(config.level, Level::Trace);

        let config = LogConfig::new().with_level(Level::Error).with_verbose(false);
        assert_eq!(config.level, Level::Error);
        assert!(!config.console);
    }
}
