use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

/// A captured log event.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    /// The event's `message`, if it had one.
    pub message: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Shared storage for captured events.
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far, in emission order.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message.as_deref().is_some_and(|m| m.contains(needle)))
            .collect()
    }

    fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// A tracing layer that records events in memory.
///
/// Intended for tests that assert on what was logged:
///
/// ```rust,ignore
/// let (subscriber, capture) = serene_telemetry::capture::subscriber();
/// let _guard = tracing::subscriber::set_default(subscriber);
/// run_turn().await;
/// assert!(!capture.matching("emergency").is_empty());
/// ```
pub struct CaptureLayer {
    storage: EventCapture,
}

impl CaptureLayer {
    pub fn new(storage: EventCapture) -> Self {
        Self { storage }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;
        let message = fields.remove("message").map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

        let metadata = event.metadata();
        self.storage.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

/// A registry with only a [`CaptureLayer`], plus the handle to read it.
pub fn subscriber() -> (impl Subscriber + Send + Sync, EventCapture) {
    let capture = EventCapture::new();
    let subscriber = Registry::default().with(CaptureLayer::new(capture.clone()));
    (subscriber, capture)
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_message_and_typed_fields() {
        let (subscriber, capture) = subscriber();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(k = 3usize, relevant = true, collection = "kb", "retrieved chunks");
            tracing::warn!(matched = ?vec!["suicide"], "emergency keywords detected");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, "INFO");
        assert_eq!(events[0].message.as_deref(), Some("retrieved chunks"));
        assert_eq!(events[0].fields["k"], 3);
        assert_eq!(events[0].fields["relevant"], true);
        assert_eq!(events[0].fields["collection"], "kb");
        assert_eq!(capture.matching("emergency").len(), 1);
        assert_eq!(capture.matching("emergency")[0].fields["matched"], "[\"suicide\"]");
    }
}
