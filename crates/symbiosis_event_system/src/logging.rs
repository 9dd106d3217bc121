//! # Logger Collaborator
//!
//! The registry and the plugin manager never decide where log output goes.
//! They build a [`LogRecord`] (severity, message and key/value fields) and hand
//! it to whatever [`EventLogger`] they were constructed with.
//!
//! - [`TracingLogger`] forwards records to the `tracing` macros and is the
//!   default everywhere.
//! - [`NullLogger`] drops everything.
//! - [`MemoryLogger`] keeps records in memory so tests can assert on them.

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, trace, warn};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Very detailed trace information
    Trace,
    /// Detailed information for debugging
    Debug,
    /// General informational messages
    Info,
    /// Warning conditions that should be investigated
    Warn,
    /// Errors that the caller should know about
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single structured log call produced by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity of the record
    pub level: LogLevel,
    /// Human readable message
    pub message: String,
    /// Contextual attributes in the order they were attached
    pub fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    /// Creates a record with no fields.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attaches a contextual attribute.
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Looks up the first attribute stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Renders the attributes as `key=value` pairs.
    pub fn display_fields(&self) -> DisplayFields<'_> {
        self.display_fields_except(&[])
    }

    /// Renders the attributes whose key is not in `skip`.
    pub fn display_fields_except<'a>(&'a self, skip: &'a [&'a str]) -> DisplayFields<'a> {
        DisplayFields {
            fields: &self.fields,
            skip,
        }
    }
}

/// `Display` adapter for a record's attributes.
pub struct DisplayFields<'a> {
    fields: &'a [(&'static str, String)],
    skip: &'a [&'a str],
}

impl fmt::Display for DisplayFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.fields.iter().filter(|(key, _)| !self.skip.contains(key));
        for (index, (key, value)) in shown.enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Attributes the core attaches often enough to get their own `tracing` field.
const PROMOTED_FIELDS: [&str; 4] = ["event_name", "plugin", "listener", "path"];

/// Receiver of the structured log calls emitted by the core.
pub trait EventLogger: Send + Sync {
    fn log(&self, record: &LogRecord);
}

/// Forwards records to `tracing`.
///
/// `event_name`, `plugin`, `listener` and `path` become fields of their own
/// when present. Any other attribute is folded into a `fields` string.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn log(&self, record: &LogRecord) {
        let event_name = record.get("event_name");
        let plugin = record.get("plugin");
        let listener = record.get("listener");
        let path = record.get("path");
        let fields = record.display_fields_except(&PROMOTED_FIELDS);

        macro_rules! emit {
            ($level:ident) => {
                $level!(
                    event_name,
                    plugin,
                    listener,
                    path,
                    fields = %fields,
                    "{}",
                    record.message
                )
            };
        }

        match record.level {
            LogLevel::Trace => emit!(trace),
            LogLevel::Debug => emit!(debug),
            LogLevel::Info => emit!(info),
            LogLevel::Warn => emit!(warn),
            LogLevel::Error => emit!(error),
        }
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl EventLogger for NullLogger {
    fn log(&self, _record: &LogRecord) {}
}

/// Keeps every record in memory.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to a registry or plugin manager.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything logged so far.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the records logged at exactly `level`.
    pub fn records_at(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .collect()
    }

    /// Returns true when some record carries exactly `message`.
    pub fn contains(&self, message: &str) -> bool {
        self.records().iter().any(|record| record.message == message)
    }

    pub fn clear(&self) {
        match self.records.lock() {
            Ok(mut records) => records.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl EventLogger for MemoryLogger {
    fn log(&self, record: &LogRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}

/// The logger used when none is supplied.
pub fn default_logger() -> Arc<dyn EventLogger> {
    Arc::new(TracingLogger)
}
