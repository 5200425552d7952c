//! Logging collaborator used by the resolver.
//!
//! Messages normally go to `tracing`. Two switches change that:
//! - **Console tracing** prints every message to stdout as
//!   `consoleTrace: (<name>) <message>`, bypassing `tracing` and the level filter
//! - **Bootstrap logging** installs a thread-scoped `tracing` subscriber,
//!   configured from a properties file, while the bootstrap file loads

use std::error::Error;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{PropertySet, PropertyStore};

/// Key in the bootstrap logging file holding an `EnvFilter` directive.
pub const LOGGING_FILTER_KEY: &str = "eeprops.logging.filter";
/// Key in the bootstrap logging file selecting `stdout` or `stderr`.
pub const LOGGING_WRITER_KEY: &str = "eeprops.logging.writer";

const DEFAULT_BOOTSTRAP_FILTER: &str = "eeprops=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Parse a level name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Atomic minimum level, shared between logger clones.
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    pub fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: LogLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level as u8 >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}

#[derive(Clone)]
pub struct Logger {
    console_tracing: bool,
    level_filter: Arc<LogLevelFilter>,
    name: Option<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            console_tracing: false,
            level_filter: Arc::new(LogLevelFilter::default()),
            name: None,
        }
    }

    pub fn with_level_filter(mut self, filter: Arc<LogLevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_console_tracing(mut self, enabled: bool) -> Self {
        self.console_tracing = enabled;
        self
    }

    pub fn is_console_tracing(&self) -> bool {
        self.console_tracing
    }

    fn console_trace(&self, message: &str, cause: Option<&dyn Error>) {
        let name = self.name.as_deref().unwrap_or("eeprops");
        println!("consoleTrace: ({name}) {message}");
        if let Some(cause) = cause {
            println!("consoleTrace: ({name}) caused by: {cause}");
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, cause: Option<&dyn Error>) {
        if self.console_tracing {
            self.console_trace(message, cause);
            return;
        }
        if !self.level_filter.should_log(level) {
            return;
        }

        let name = self.name.as_deref().unwrap_or_default();
        match (level, cause) {
            (LogLevel::Error, Some(cause)) => {
                tracing::error!(logger = %name, cause = %cause, "{}", message)
            }
            (LogLevel::Error, None) => tracing::error!(logger = %name, "{}", message),
            (LogLevel::Warn, Some(cause)) => {
                tracing::warn!(logger = %name, cause = %cause, "{}", message)
            }
            (LogLevel::Warn, None) => tracing::warn!(logger = %name, "{}", message),
            (LogLevel::Info, Some(cause)) => {
                tracing::info!(logger = %name, cause = %cause, "{}", message)
            }
            (LogLevel::Info, None) => tracing::info!(logger = %name, "{}", message),
            (LogLevel::Debug, Some(cause)) => {
                tracing::debug!(logger = %name, cause = %cause, "{}", message)
            }
            (LogLevel::Debug, None) => tracing::debug!(logger = %name, "{}", message),
            (LogLevel::Trace, Some(cause)) => {
                tracing::trace!(logger = %name, cause = %cause, "{}", message)
            }
            (LogLevel::Trace, None) => tracing::trace!(logger = %name, "{}", message),
        }
    }

    pub fn trace(&self, msg: &str) {
        self.log(LogLevel::Trace, msg, None);
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg, None);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg, None);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg, None);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg, None);
    }

    pub fn debug_with_cause(&self, msg: &str, cause: &dyn Error) {
        self.log(LogLevel::Debug, msg, Some(cause));
    }

    pub fn error_with_cause(&self, msg: &str, cause: &dyn Error) {
        self.log(LogLevel::Error, msg, Some(cause));
    }

    /// Log every property as `name = value`.
    pub fn dump_properties(&self, level: LogLevel, store: &PropertyStore) {
        if !self.console_tracing && !self.level_filter.should_log(level) {
            return;
        }
        for (name, value) in store.iter() {
            self.log(level, &format!("{name} = {value}"), None);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWriter {
    Stdout,
    Stderr,
}

/// Subscriber settings for the bootstrap phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapLogging {
    pub filter: String,
    pub writer: LogWriter,
}

impl BootstrapLogging {
    pub fn from_properties(properties: &PropertySet) -> Self {
        let filter = properties
            .get(LOGGING_FILTER_KEY)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP_FILTER.to_string());
        let writer = match properties.get(LOGGING_WRITER_KEY).map(|w| w.trim()) {
            Some("stdout") => LogWriter::Stdout,
            _ => LogWriter::Stderr,
        };
        Self { filter, writer }
    }

    /// Install as the current thread's default subscriber until the guard drops.
    pub fn install(&self) -> Result<DefaultGuard, tracing_subscriber::filter::ParseError> {
        let filter = EnvFilter::try_new(&self.filter)?;
        let guard = match self.writer {
            LogWriter::Stdout => tracing::subscriber::set_default(
                FmtSubscriber::builder()
                    .with_env_filter(filter)
                    .with_writer(std::io::stdout)
                    .finish(),
            ),
            LogWriter::Stderr => tracing::subscriber::set_default(
                FmtSubscriber::builder()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .finish(),
            ),
        };
        Ok(guard)
    }
}
