//! Native debug message monitoring
//!
//! Optional: a renderer without a monitor renders identically, it just
//! reports less.

use crate::foundation::logging::{DiagnosticSink, LogSeverity, LogSource};

/// Severity reported by the native debug output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugSeverity {
    /// Errors and undefined behaviour
    High,
    /// Performance warnings and deprecated usage
    Medium,
    /// Redundant state changes and similar
    Low,
    /// Purely informational
    Notification,
}

impl From<DebugSeverity> for LogSeverity {
    fn from(severity: DebugSeverity) -> Self {
        match severity {
            DebugSeverity::High => Self::Error,
            DebugSeverity::Medium => Self::Warn,
            DebugSeverity::Low => Self::Info,
            DebugSeverity::Notification => Self::Debug,
        }
    }
}

/// One message drained from the native debug log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererDebugMessage {
    /// Native source code (API, shader compiler, ...)
    pub source: u32,
    /// Native message type code
    pub kind: u32,
    /// Native message id
    pub id: u32,
    /// Severity
    pub severity: DebugSeverity,
    /// Message text
    pub message: String,
}

/// Collects native debug messages between frames
pub trait RendererDebugMessageMonitor {
    /// Drop all collected messages
    fn clear_messages(&mut self);

    /// Enable or disable native debug output
    fn set_debugging(&mut self, enabled: bool);

    /// Whether native debug output is enabled
    fn is_debugging_enabled(&self) -> bool;

    /// Messages collected since the last clear
    fn messages(&self) -> &[RendererDebugMessage];

    /// Drain the native log into the message list; returns how many arrived
    fn poll(&mut self) -> usize;
}

/// Poll, forward every message to `sink`, then clear
///
/// Meant to be called once per frame.
pub fn log_debug_messages_and_flush(monitor: &mut dyn RendererDebugMessageMonitor, sink: &dyn DiagnosticSink) -> usize {
    monitor.poll();
    let count = monitor.messages().len();
    for message in monitor.messages() {
        sink.log(
            LogSource::Renderer,
            message.severity.into(),
            &format!("[gl debug {}] {}", message.id, message.message),
        );
    }
    monitor.clear_messages();
    count
}
