//! Logging factory.
//!
//! Components never pick a log sink themselves. They ask an injected
//! [`SearchLogFactory`] for one of two handles:
//!
//! - a **job logger**, scoped to one running reindex job, and
//! - an **output logger**, a named handle with an explicit verbosity.
//!
//! Both are [`SearchLogger`]s backed by `tracing` spans, so the host decides
//! where the events end up by installing a subscriber. [`CapturingLogFactory`]
//! additionally keeps every line in memory for assertions.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::types::JobId;

/// Severity of a captured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Verbose diagnostics (only emitted by verbose loggers).
    Debug,
    /// Progress information.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

/// A line kept by a capturing logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Name of the logger that produced the line
    pub logger: String,
    /// Severity
    pub level: LogLevel,
    /// Rendered message
    pub message: String,
}

type Capture = Arc<Mutex<Vec<LogLine>>>;

/// A log handle handed out by a [`SearchLogFactory`].
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SearchLogger {
    name: String,
    span: tracing::Span,
    verbose: bool,
    capture: Option<Capture>,
}

impl SearchLogger {
    /// Creates a logger emitting inside `span`.
    pub fn new(name: impl Into<String>, span: tracing::Span, verbose: bool) -> Self {
        Self {
            name: name.into(),
            span,
            verbose,
            capture: None,
        }
    }

    /// Logger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether debug lines are emitted.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Emits a debug line (verbose loggers only).
    pub fn debug(&self, message: impl fmt::Display) {
        if self.verbose {
            tracing::debug!(parent: &self.span, "{message}");
            self.keep(LogLevel::Debug, &message);
        }
    }

    /// Emits an info line.
    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(parent: &self.span, "{message}");
        self.keep(LogLevel::Info, &message);
    }

    /// Emits a warning.
    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(parent: &self.span, "{message}");
        self.keep(LogLevel::Warn, &message);
    }

    /// Emits an error.
    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(parent: &self.span, "{message}");
        self.keep(LogLevel::Error, &message);
    }

    fn keep(&self, level: LogLevel, message: &dyn fmt::Display) {
        if let Some(capture) = &self.capture {
            let mut lines = capture.lock().unwrap_or_else(|e| e.into_inner());
            lines.push(LogLine {
                logger: self.name.clone(),
                level,
                message: message.to_string(),
            });
        }
    }
}

impl fmt::Debug for SearchLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchLogger")
            .field("name", &self.name)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Source of log handles for jobs and generic output.
pub trait SearchLogFactory: Send + Sync {
    /// Logger for one running reindex job.
    fn job_logger(&self, job: &JobId, index: &str) -> SearchLogger;

    /// Named output logger with explicit verbosity.
    fn output_logger(&self, name: &str, verbose: bool) -> SearchLogger;
}

/// Default factory: plain `tracing` spans.
///
/// Job loggers are verbose; per-batch detail is what an operator needs to
/// replay a failed batch by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogFactory;

impl SearchLogFactory for TracingLogFactory {
    fn job_logger(&self, job: &JobId, index: &str) -> SearchLogger {
        let span = tracing::info_span!("reindex_job", job_id = %job, index = %index);
        SearchLogger::new(format!("job:{job}"), span, true)
    }

    fn output_logger(&self, name: &str, verbose: bool) -> SearchLogger {
        let span = tracing::info_span!("searchsync", logger = %name);
        SearchLogger::new(name, span, verbose)
    }
}

/// Factory whose loggers also keep every line in memory.
#[derive(Debug, Clone, Default)]
pub struct CapturingLogFactory {
    lines: Capture,
}

impl CapturingLogFactory {
    /// Creates an empty capturing factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured lines, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Captured lines at or above `level`.
    pub fn lines_at_least(&self, level: LogLevel) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|l| l.level >= level)
            .collect()
    }

    fn attach(&self, mut logger: SearchLogger) -> SearchLogger {
        logger.capture = Some(Arc::clone(&self.lines));
        logger
    }
}

impl SearchLogFactory for CapturingLogFactory {
    fn job_logger(&self, job: &JobId, index: &str) -> SearchLogger {
        self.attach(TracingLogFactory.job_logger(job, index))
    }

    fn output_logger(&self, name: &str, verbose: bool) -> SearchLogger {
        self.attach(TracingLogFactory.output_logger(name, verbose))
    }
}
