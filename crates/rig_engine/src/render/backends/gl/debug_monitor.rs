//! Native debug output drained through `GL_KHR_debug`

use std::rc::Rc;

use super::api::{debug_severity_from_native, Capability, GlApi};
use crate::render::api::{RendererDebugMessage, RendererDebugMessageMonitor};

/// Collects messages from the native debug message log
pub struct GlDebugMessageMonitor {
    api: Rc<dyn GlApi>,
    enabled: bool,
    batch: u32,
    messages: Vec<RendererDebugMessage>,
}

impl GlDebugMessageMonitor {
    /// Create a disabled monitor that drains `batch` entries per native call
    pub fn new(api: Rc<dyn GlApi>, batch: u32) -> Self {
        Self {
            api,
            enabled: false,
            batch: batch.max(1),
            messages: Vec::new(),
        }
    }
}

impl RendererDebugMessageMonitor for GlDebugMessageMonitor {
    fn clear_messages(&mut self) {
        self.messages.clear();
    }

    fn set_debugging(&mut self, enabled: bool) {
        self.api.set_capability(Capability::DebugOutput, enabled);
        self.api.set_capability(Capability::DebugOutputSynchronous, enabled);
        self.enabled = enabled;
    }

    fn is_debugging_enabled(&self) -> bool {
        self.enabled
    }

    fn messages(&self) -> &[RendererDebugMessage] {
        &self.messages
    }

    fn poll(&mut self) -> usize {
        if !self.enabled {
            return 0;
        }
        let before = self.messages.len();
        loop {
            let drained = self.api.debug_message_log(self.batch);
            let exhausted = drained.len() < self.batch as usize;
            self.messages.extend(drained.into_iter().map(|raw| RendererDebugMessage {
                source: raw.source,
                kind: raw.kind,
                id: raw.id,
                severity: debug_severity_from_native(raw.severity),
                message: raw.message,
            }));
            if exhausted {
                break;
            }
        }
        self.messages.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::logging::{LogSeverity, RecordingSink};
    use crate::render::api::{log_debug_messages_and_flush, DebugSeverity};
    use crate::render::backends::gl::api::{RawDebugMessage, DEBUG_SEVERITY_MEDIUM};
    use crate::render::backends::gl::headless::HeadlessGl;

    fn message(id: u32) -> RawDebugMessage {
        RawDebugMessage {
            source: 0x8246,
            kind: 0x824F,
            id,
            severity: DEBUG_SEVERITY_MEDIUM,
            message: format!("message {id}"),
        }
    }

    #[test]
    fn test_disabled_monitor_collects_nothing() {
        let gl = Rc::new(HeadlessGl::new());
        let mut monitor = GlDebugMessageMonitor::new(gl.clone(), 4);
        gl.push_debug_message(message(1));

        assert_eq!(monitor.poll(), 0);
        assert!(monitor.messages().is_empty());
    }

    #[test]
    fn test_poll_drains_in_batches() {
        let gl = Rc::new(HeadlessGl::new());
        let mut monitor = GlDebugMessageMonitor::new(gl.clone(), 2);
        monitor.set_debugging(true);
        assert!(gl.capability_enabled(Capability::DebugOutput));

        for id in 0..5 {
            gl.push_debug_message(message(id));
        }
        assert_eq!(monitor.poll(), 5);
        assert_eq!(monitor.messages()[4].id, 4);
        assert_eq!(monitor.messages()[0].severity, DebugSeverity::Medium);
    }

    #[test]
    fn test_flush_forwards_and_clears() {
        let gl = Rc::new(HeadlessGl::new());
        let mut monitor = GlDebugMessageMonitor::new(gl.clone(), 8);
        monitor.set_debugging(true);
        gl.push_debug_message(message(7));
        let sink = RecordingSink::new();

        assert_eq!(log_debug_messages_and_flush(&mut monitor, &sink), 1);
        assert!(monitor.messages().is_empty());
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, LogSeverity::Warn);
        assert!(entries[0].message.contains("message 7"));
    }
}
