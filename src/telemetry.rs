//! Telemetry sinks
//!
//! Optional, application-controlled event recording. The runtime never
//! forces collection: the default sink discards everything. The channel shim
//! records its close outcome here regardless of success or failure.

use std::sync::{Arc, RwLock};

/// A single recorded event: a name and the outcome code of the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub name: String,
    pub code: i32,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>, code: i32) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Default sink: discards every event.
#[derive(Debug, Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct InMemoryTelemetrySink {
    events: RwLock<Vec<TelemetryEvent>>,
}

impl InMemoryTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl TelemetrySink for InMemoryTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

static GLOBAL_SINK: once_cell::sync::Lazy<RwLock<Arc<dyn TelemetrySink>>> =
    once_cell::sync::Lazy::new(|| RwLock::new(Arc::new(NoopTelemetrySink)));

/// Returns the globally configured telemetry sink.
pub fn get_telemetry_sink() -> Arc<dyn TelemetrySink> {
    GLOBAL_SINK
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Sets the global telemetry sink. Channels built without an explicit sink
/// record here.
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) {
    *GLOBAL_SINK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = sink;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_survives_a_poisoned_lock() {
        let sink = Arc::new(InMemoryTelemetrySink::new());
        let poisoner = Arc::clone(&sink);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.events.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        sink.record(TelemetryEvent::new("after_poison", 0));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].name, "after_poison");
    }

    #[test]
    fn test_in_memory_sink_records_in_order() {
        let sink = InMemoryTelemetrySink::new();
        sink.record(TelemetryEvent::new("first", 0));
        sink.record(TelemetryEvent::new("second", -1));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], TelemetryEvent::new("first", 0));
        assert_eq!(events[1].code, -1);
    }
}
