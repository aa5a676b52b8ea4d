//! Logging utilities and the injectable diagnostic sink
//!
//! Library code logs through the `log` facade. Components that must report
//! resource failures to the application (the renderer, the animation data)
//! receive a [`DiagnosticSink`] at construction instead of reaching for a
//! process-wide logger.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Subsystem a diagnostic originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// Engine-wide plumbing (config, assets)
    Engine,
    /// GPU resource creation and draw submission
    Renderer,
    /// Skeletal animation evaluation
    Animation,
    /// Application code
    Application,
}

impl LogSource {
    /// Log target name used when forwarding to the `log` facade
    pub const fn target(self) -> &'static str {
        match self {
            Self::Engine => "rig_engine",
            Self::Renderer => "rig_engine::render",
            Self::Animation => "rig_engine::animation",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Engine => "Engine",
            Self::Renderer => "Renderer",
            Self::Animation => "Animation",
            Self::Application => "Application",
        };
        f.write_str(name)
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose tracing output
    Trace,
    /// Debug output
    Debug,
    /// Informational output
    Info,
    /// Something failed but rendering can continue degraded
    Warn,
    /// Something failed and the result is unusable
    Error,
}

impl From<LogSeverity> for log::Level {
    fn from(severity: LogSeverity) -> Self {
        match severity {
            LogSeverity::Trace => Self::Trace,
            LogSeverity::Debug => Self::Debug,
            LogSeverity::Info => Self::Info,
            LogSeverity::Warn => Self::Warn,
            LogSeverity::Error => Self::Error,
        }
    }
}

/// Capability to receive human-readable diagnostics
///
/// Implementations decide formatting and transport; the engine only
/// guarantees that every resource-creation failure produces at least one
/// `Warn` (or worse) entry.
pub trait DiagnosticSink {
    /// Record a single diagnostic message
    fn log(&self, source: LogSource, severity: LogSeverity, message: &str);
}

/// Shared handle to a diagnostic sink
pub type SharedSink = Rc<dyn DiagnosticSink>;

/// Sink that forwards everything to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl DiagnosticSink for LogCrateSink {
    fn log(&self, source: LogSource, severity: LogSeverity, message: &str) {
        log::log!(target: source.target(), log::Level::from(severity), "{}", message);
    }
}

/// Create the default sink used when the application does not supply one
pub fn default_sink() -> SharedSink {
    Rc::new(LogCrateSink)
}

/// A single recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    /// Originating subsystem
    pub source: LogSource,
    /// Severity level
    pub severity: LogSeverity,
    /// Message text
    pub message: String,
}

/// Sink that keeps every entry in memory
///
/// Used by tests and tools that want to inspect what the engine reported.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: RefCell<Vec<DiagnosticEntry>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries.borrow().clone()
    }

    /// Number of entries at or above `severity`
    pub fn count_at_least(&self, severity: LogSeverity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.severity >= severity)
            .count()
    }

    /// Drop all recorded entries
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn log(&self, source: LogSource, severity: LogSeverity, message: &str) {
        self.entries.borrow_mut().push(DiagnosticEntry {
            source,
            severity,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_counts_by_severity() {
        let sink = RecordingSink::new();
        sink.log(LogSource::Renderer, LogSeverity::Info, "created program");
        sink.log(LogSource::Renderer, LogSeverity::Warn, "texture creation failed");
        sink.log(LogSource::Animation, LogSeverity::Error, "bad hierarchy");

        assert_eq!(sink.entries().len(), 3);
        assert_eq!(sink.count_at_least(LogSeverity::Warn), 2);
        assert_eq!(sink.count_at_least(LogSeverity::Error), 1);

        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_severity_maps_to_log_level() {
        assert_eq!(log::Level::from(LogSeverity::Warn), log::Level::Warn);
        assert_eq!(log::Level::from(LogSeverity::Trace), log::Level::Trace);
    }
}
