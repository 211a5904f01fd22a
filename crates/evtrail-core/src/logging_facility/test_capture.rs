//! In-memory capture of evtrail's tracing output
//!
//! The capture layer decodes the fields this crate puts on every event
//! (`component`, `op`, `event`, the correlation id, the evidence hash and the
//! fallback error code/kind) into typed slots, and keeps everything else
//! as strings in [`CapturedEvent::fields`].

use crate::instrument::FALLBACK_TARGET;
use evtrail_core_types::schema::{
    FIELD_COMPONENT, FIELD_CORRELATION_ID, FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_EVENT,
    FIELD_EVIDENCE_HASH, FIELD_OP,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded tracing event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub component: Option<String>,
    pub op: Option<String>,
    pub event: Option<String>,
    pub correlation_id: Option<String>,
    pub evidence_hash: Option<String>,
    pub err_code: Option<String>,
    pub err_kind: Option<String>,
    /// Remaining fields, `message` included
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    fn from_fields(level: Level, target: &str, mut fields: BTreeMap<String, String>) -> Self {
        let mut take = |name: &str| fields.remove(name);
        Self {
            level,
            target: target.to_string(),
            component: take(FIELD_COMPONENT),
            op: take(FIELD_OP),
            event: take(FIELD_EVENT),
            correlation_id: take(FIELD_CORRELATION_ID),
            evidence_hash: take(FIELD_EVIDENCE_HASH),
            err_code: take(FIELD_ERR_CODE),
            err_kind: take(FIELD_ERR_KIND),
            fields,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.target == FALLBACK_TARGET
    }

    /// The bundle a `TracingSink` attached, parsed back from JSON
    pub fn bundle(&self) -> Option<serde_json::Value> {
        self.fields
            .get("bundle")
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

type Buffer = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer {
    events: Buffer,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut fields = Fields::default();
        event.record(&mut fields);
        let captured = CapturedEvent::from_fields(*metadata.level(), metadata.target(), fields.0);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
    }
}

/// Shared handle onto the captured events
#[derive(Clone)]
pub struct TestCapture {
    events: Buffer,
}

impl TestCapture {
    /// Every event captured so far, in emission order
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events for one `op`
    pub fn for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op.as_deref() == Some(op))
            .collect()
    }

    /// Events carrying one correlation id
    pub fn for_correlation(&self, correlation_id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.correlation_id.as_deref() == Some(correlation_id))
            .collect()
    }

    /// Events on the instrumenter's fallback channel
    pub fn fallback_events(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(CapturedEvent::is_fallback)
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// # Panics
    ///
    /// Panics if no event with this `op` and `event` was captured
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "Expected event op={} event={} not found in {} captured events",
            op,
            event,
            events.len()
        );
    }

    /// Fallback reports for `op` with error code `code`
    ///
    /// # Panics
    ///
    /// Panics if there are none, or if any of them is not at `WARN`
    pub fn assert_fallback_reported(&self, op: &str, code: &str) -> Vec<CapturedEvent> {
        let reports: Vec<CapturedEvent> = self
            .fallback_events()
            .into_iter()
            .filter(|e| e.is(op, "evidence_dropped") && e.err_code.as_deref() == Some(code))
            .collect();
        assert!(
            !reports.is_empty(),
            "Expected fallback report op={} code={} not found",
            op,
            code
        );
        assert!(
            reports.iter().all(|e| e.level == Level::WARN),
            "Fallback reports for op={} must be WARN",
            op
        );
        reports
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the global subscriber and return its handle
///
/// The first call installs; later calls in the same process share the same
/// buffer, so tests filter by unique `op` names or correlation ids.
///
/// # Example
///
/// ```
/// use evtrail_core::logging_facility::test_capture::init_test_capture;
///
/// let capture = init_test_capture();
/// tracing::info!(component = "demo", op = "my_operation", event = "start", correlation_id = "c-1");
/// capture.assert_event_exists("my_operation", "start");
/// assert_eq!(capture.for_correlation("c-1").len(), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Buffer::default();
            tracing_subscriber::registry()
                .with(CaptureLayer {
                    events: events.clone(),
                })
                .init();
            TestCapture { events }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_known_fields_are_typed() {
        let event = CapturedEvent::from_fields(
            Level::WARN,
            FALLBACK_TARGET,
            raw(&[
                ("op", "charge"),
                ("event", "evidence_dropped"),
                ("correlation_id", "req-1"),
                ("err_code", "ERR_SINK_UNAVAILABLE"),
                ("err_kind", "SinkUnavailable"),
                ("message", "evidence record dropped"),
            ]),
        );
        assert!(event.is_fallback());
        assert!(event.is("charge", "evidence_dropped"));
        assert_eq!(event.correlation_id.as_deref(), Some("req-1"));
        assert_eq!(event.err_code.as_deref(), Some("ERR_SINK_UNAVAILABLE"));
        assert_eq!(event.err_kind.as_deref(), Some("SinkUnavailable"));
        assert_eq!(event.evidence_hash, None);
        assert_eq!(event.fields.len(), 1);
        assert!(event.fields.contains_key("message"));
    }

    #[test]
    fn test_bundle_parsed_from_field() {
        let event = CapturedEvent::from_fields(
            Level::INFO,
            "evtrail_core::sink",
            raw(&[("bundle", r#"{"status":"completed"}"#)]),
        );
        assert!(!event.is_fallback());
        assert_eq!(event.bundle().unwrap()["status"], "completed");
    }
}
