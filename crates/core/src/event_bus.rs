//! View event bus: the sink every presentation component writes into.
//!
//! Controllers and simulators accept an `Arc<dyn EventSink<E>>` and push
//! typed events (pane switches, dialogs, tables, chat messages) instead of
//! touching a document tree. The terminal front end, tests, and any other
//! renderer implement the trait.

use std::sync::{Arc, Mutex};

/// Trait for receiving view events.
pub trait EventSink<E>: Send + Sync {
    fn emit(&self, event: E);
}

/// No-op sink for headless runs that don't render anything.
pub struct NoOpSink;

impl<E> EventSink<E> for NoOpSink {
    fn emit(&self, _event: E) {}
}

/// In-memory sink that captures events for testing.
pub struct CaptureSink<E> {
    events: Mutex<Vec<E>>,
}

impl<E> Default for CaptureSink<E> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Clone> CaptureSink<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    /// Number of captured events for which `pred` holds.
    pub fn count_where(&self, pred: impl Fn(&E) -> bool) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| pred(e))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl<E: Send> EventSink<E> for CaptureSink<E> {
    fn emit(&self, event: E) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

/// Convenience: a sink that drops everything.
pub fn noop_sink<E: 'static>() -> Arc<dyn EventSink<E>> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink<E: Clone>() -> Arc<CaptureSink<E>> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink::<String>();
        assert_eq!(sink.count(), 0);

        sink.emit("upload".to_string());
        sink.emit("lifecycle".to_string());
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_where(|e| e.starts_with('u')), 1);
        assert_eq!(sink.events()[1], "lifecycle");

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        let sink = noop_sink::<u32>();
        sink.emit(7);
    }
}
