//! Logging façade with fan-out to registered sinks.
//!
//! A [`Logger`] holds an ordered list of [`LogSink`]s. Each call delivers one
//! [`LogRecord`] (message, severity, source location) to every sink,
//! synchronously and in registration order. A failing or panicking sink is
//! noted through `tracing` and skipped; the remaining sinks still receive the
//! record.
//!
//! # Example
//!
//! ```
//! use single_entry_runtime::logging::{Logger, TracingSink};
//!
//! let logger = Logger::new().with_sink(TracingSink);
//! logger.info("profile loaded");
//! ```

use crate::middleware::{AnalyticsSink, CrashReporter, Incident};
use serde::{Deserialize, Serialize};
use single_entry_core::event::AnalyticsRecord;
use std::fmt;
use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::Arc;
use thiserror::Error;

/// Severity of a log record, from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Very detailed diagnostics
    Trace,
    /// Diagnostics useful while developing
    Debug,
    /// Normal operation
    Info,
    /// Something unexpected that was recovered from
    Warning,
    /// A failure that needs attention
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One message delivered to every sink
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// The message text
    pub message: String,
    /// How severe the message is
    pub severity: Severity,
    /// Where the message was logged from
    pub location: &'static Location<'static>,
}

/// A sink could not accept a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("log sink failed: {0}")]
pub struct SinkError(pub String);

/// Destination of log records
pub trait LogSink: Send + Sync {
    /// Accept one record
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the record could not be written. Other
    /// sinks are unaffected.
    fn receive(&self, record: &LogRecord) -> Result<(), SinkError>;
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn receive(&self, record: &LogRecord) -> Result<(), SinkError> {
        (**self).receive(record)
    }
}

/// Fan-out logger
///
/// Cloning is cheap; clones share the same sinks.
#[derive(Clone, Default)]
pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Logger {
    /// Create a logger with no sinks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink after the existing ones
    #[must_use]
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Number of registered sinks
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver a message to every sink
    #[track_caller]
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let record = LogRecord {
            message: message.into(),
            severity,
            location: Location::caller(),
        };

        for (index, sink) in self.sinks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| sink.receive(&record))) {
                Ok(Ok(())) => {},
                Ok(Err(error)) => {
                    tracing::warn!(sink = index, error = %error, "Log sink failed");
                },
                Err(_) => {
                    tracing::warn!(sink = index, "Log sink panicked");
                },
            }
        }
    }

    /// Log at [`Severity::Trace`]
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Severity::Trace, message);
    }

    /// Log at [`Severity::Debug`]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    /// Log at [`Severity::Info`]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    /// Log at [`Severity::Warning`]
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    /// Log at [`Severity::Error`]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Forwards records into `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn receive(&self, record: &LogRecord) -> Result<(), SinkError> {
        let file = record.location.file();
        let line = record.location.line();
        let message = record.message.as_str();
        match record.severity {
            Severity::Trace => tracing::trace!(file, line, "{message}"),
            Severity::Debug => tracing::debug!(file, line, "{message}"),
            Severity::Info => tracing::info!(file, line, "{message}"),
            Severity::Warning => tracing::warn!(file, line, "{message}"),
            Severity::Error => tracing::error!(file, line, "{message}"),
        }
        Ok(())
    }
}

/// Crash reporter writing incidents to a [`Logger`] at error severity
///
/// The record's location is the caller of [`report`](CrashReporter::report)
/// when it is called on this type directly. Calls through a
/// `dyn CrashReporter`, as the middleware makes them, record the location of
/// the middleware instead.
#[derive(Debug, Clone)]
pub struct LoggingCrashReporter {
    logger: Logger,
}

impl LoggingCrashReporter {
    /// Create a reporter backed by `logger`
    #[must_use]
    pub const fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl CrashReporter for LoggingCrashReporter {
    #[track_caller]
    fn report(&self, incident: Incident) {
        self.logger.error(incident.to_string());
    }
}

/// Analytics sink writing records to a [`Logger`] at info severity
///
/// Records the caller's location the same way as [`LoggingCrashReporter`].
#[derive(Debug, Clone)]
pub struct LoggingAnalytics {
    logger: Logger,
}

impl LoggingAnalytics {
    /// Create a sink backed by `logger`
    #[must_use]
    pub const fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl AnalyticsSink for LoggingAnalytics {
    #[track_caller]
    fn track(&self, record: AnalyticsRecord) {
        let parameters = record
            .parameters
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        self.logger
            .info(format!("analytics {} ({}) {parameters}", record.name, record.kind));
    }
}
