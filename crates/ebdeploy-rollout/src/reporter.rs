//! User-facing deployment narration.
//!
//! Components never write to a global logger for progress lines; they are
//! handed a [`Reporter`] and narrate through it. [`TracingReporter`] forwards
//! to `tracing`, [`RecordingReporter`] keeps the lines for tests.

use ebdeploy_model::EventRecord;
use parking_lot::Mutex;

/// Severity of a narrated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    /// Progress.
    Info,
    /// Something tolerated, such as a skipped throttled poll.
    Warn,
    /// A failure.
    Error,
}

/// Sink for deployment narration.
pub trait Reporter: Send + Sync {
    /// Emit one line.
    fn report(&self, level: ReportLevel, message: &str);

    /// Emit a progress line.
    fn info(&self, message: &str) {
        self.report(ReportLevel::Info, message);
    }

    /// Emit a warning line.
    fn warn(&self, message: &str) {
        self.report(ReportLevel::Warn, message);
    }

    /// Emit a failure line.
    fn error(&self, message: &str) {
        self.report(ReportLevel::Error, message);
    }

    /// Emit one platform event.
    fn event(&self, event: &EventRecord) {
        let level = match event.severity.as_str() {
            "ERROR" | "FATAL" => ReportLevel::Error,
            "WARN" => ReportLevel::Warn,
            _ => ReportLevel::Info,
        };
        self.report(level, &event.to_string());
    }
}

/// [`Reporter`] emitting `tracing` events under the `ebdeploy` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => tracing::info!(target: "ebdeploy", "{message}"),
            ReportLevel::Warn => tracing::warn!(target: "ebdeploy", "{message}"),
            ReportLevel::Error => tracing::error!(target: "ebdeploy", "{message}"),
        }
    }
}

/// [`Reporter`] that records every line in order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(ReportLevel, String)>>,
}

impl RecordingReporter {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line with its level.
    #[must_use]
    pub fn lines(&self) -> Vec<(ReportLevel, String)> {
        self.lines.lock().clone()
    }

    /// Every recorded message, levels dropped.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Whether any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, m)| m.contains(needle))
    }

    /// Index of the first message containing `needle`.
    #[must_use]
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines.lock().iter().position(|(_, m)| m.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        self.lines.lock().push((level, message.to_owned()));
    }
}
