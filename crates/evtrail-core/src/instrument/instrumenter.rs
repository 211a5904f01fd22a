//! Wrapping units of work with correlation-tagged evidence.

use crate::canonical::{Map, Value};
use crate::correlation::CorrelationRegistry;
use crate::errors::{EvtrailError, ExError, Result};
use crate::evidence::{build_bundle, EvidenceBundle};
use crate::instrument::options::{InstrumentOptions, LogLevel};
use crate::instrument::record::{ActionRecord, PANIC_KIND};
use crate::instrument::sanitize::{summarize_args, summarize_result, UNENCODABLE};
use crate::sink::LogSink;
use evtrail_core_types::{CorrelationId, EventType};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt::{self, Display};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracing target of the fallback diagnostic channel
pub const FALLBACK_TARGET: &str = "evtrail::fallback";

/// Emits start/end/error evidence bundles around wrapped work
///
/// Failures inside the instrumentation itself (unencodable payloads, a sink
/// that errors or panics) never reach the wrapped function's caller. They are
/// reported as `WARN` events on [`FALLBACK_TARGET`] and counted in
/// [`dropped_records`](Self::dropped_records).
#[derive(Clone)]
pub struct ActionInstrumenter {
    registry: CorrelationRegistry,
    sink: Arc<dyn LogSink>,
    defaults: InstrumentOptions,
    dropped: Arc<AtomicU64>,
}

impl ActionInstrumenter {
    pub fn new(registry: CorrelationRegistry, sink: impl LogSink + 'static) -> Self {
        Self::with_shared_sink(registry, Arc::new(sink))
    }

    pub fn with_shared_sink(registry: CorrelationRegistry, sink: Arc<dyn LogSink>) -> Self {
        Self {
            registry,
            sink,
            defaults: InstrumentOptions::default(),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the options used by `call` and `call_async`
    pub fn with_defaults(mut self, defaults: InstrumentOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &InstrumentOptions {
        &self.defaults
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    /// Records lost to instrumentation failures since creation
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Run `f` once under instrumentation with the default options
    ///
    /// `args` describes the call's arguments; it is only serialized, never
    /// passed to `f`. An `Err` from `f` is returned unchanged after the error
    /// bundle is emitted; a panic is resumed with its original payload.
    pub fn call<A, T, E, F>(&self, action: &str, args: &A, f: F) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let options = self.defaults.clone();
        self.call_with(action, &options, args, f)
    }

    /// Run `f` once under instrumentation with explicit options
    pub fn call_with<A, T, E, F>(
        &self,
        action: &str,
        options: &InstrumentOptions,
        args: &A,
        f: F,
    ) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let summary = options.capture_args.then(|| summarize_args(args));
        self.invoke(action, options, summary, f)
    }

    /// Await `future` under instrumentation with the default options
    ///
    /// Dropping the returned future before it completes emits a terminal
    /// bundle with status `cancelled`.
    pub async fn call_async<A, T, E, Fut>(
        &self,
        action: &str,
        args: &A,
        future: Fut,
    ) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let options = self.defaults.clone();
        self.call_async_with(action, &options, args, future).await
    }

    /// Await `future` under instrumentation with explicit options
    ///
    /// Outside a task lane the call runs in a lane of its own, so values set
    /// by `future` survive its `.await`s and no id is cached on the worker
    /// thread.
    pub async fn call_async_with<A, T, E, Fut>(
        &self,
        action: &str,
        options: &InstrumentOptions,
        args: &A,
        future: Fut,
    ) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.registry
            .in_own_task_lane(self.invoke_async(action, options, args, future))
            .await
    }

    async fn invoke_async<A, T, E, Fut>(
        &self,
        action: &str,
        options: &InstrumentOptions,
        args: &A,
        future: Fut,
    ) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize,
        E: Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let summary = options.capture_args.then(|| summarize_args(args));
        let mut record = ActionRecord::new(self, action, options);
        record.start(summary);

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => {
                record.complete(options.capture_result.then(|| summarize_result(&value)));
                Ok(value)
            }
            Ok(Err(err)) => {
                record.fail_with(&err);
                Err(err)
            }
            Err(payload) => {
                record.fail(PANIC_KIND, PANIC_KIND, &panic_message(payload.as_ref()));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Wrap `f` so every call is instrumented
    ///
    /// The argument bundle `A` is summarized (and sanitized) before being
    /// handed to `f`.
    pub fn wrap<A, T, E, F>(
        &self,
        action: impl Into<String>,
        options: InstrumentOptions,
        f: F,
    ) -> impl Fn(A) -> std::result::Result<T, E>
    where
        A: Serialize,
        T: Serialize,
        E: Display,
        F: Fn(A) -> std::result::Result<T, E>,
    {
        let this = self.clone();
        let action = action.into();
        move |args: A| {
            let summary = options.capture_args.then(|| summarize_args(&args));
            this.invoke(&action, &options, summary, || f(args))
        }
    }

    /// Emit a standalone event (decision, artifact, warning, …) tagged with
    /// the current correlation id
    ///
    /// # Errors
    ///
    /// Returns the bundle builder's error (`UnencodableValue`,
    /// `ReservedField`) so the caller can redact and retry. Sink failures go
    /// to the fallback channel and are not returned.
    pub fn record_event(
        &self,
        event_type: EventType,
        level: LogLevel,
        payload: Map,
    ) -> Result<EvidenceBundle> {
        let correlation_id = self.registry.get();
        let bundle = build_bundle(event_type, &correlation_id, payload)?;
        self.deliver(bundle.event_type().as_str(), level, &bundle);
        Ok(bundle)
    }

    fn invoke<T, E, F>(
        &self,
        action: &str,
        options: &InstrumentOptions,
        args: Option<Value>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize,
        E: Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let mut record = ActionRecord::new(self, action, options);
        record.start(args);

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => {
                record.complete(options.capture_result.then(|| summarize_result(&value)));
                Ok(value)
            }
            Ok(Err(err)) => {
                record.fail_with(&err);
                Err(err)
            }
            Err(payload) => {
                record.fail(PANIC_KIND, PANIC_KIND, &panic_message(payload.as_ref()));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Seal and deliver one bundle; never fails
    pub(crate) fn emit(
        &self,
        op: &str,
        correlation_id: &CorrelationId,
        event_type: EventType,
        level: LogLevel,
        payload: Map,
    ) {
        match seal(correlation_id, event_type, payload) {
            Ok(bundle) => self.deliver(op, level, &bundle),
            Err(err) => self.report(op, correlation_id, err),
        }
    }

    fn deliver(&self, op: &str, level: LogLevel, bundle: &EvidenceBundle) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.sink.write(level, bundle)));
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => EvtrailError::SinkUnavailable {
                message: format!("sink panicked: {}", panic_message(payload.as_ref())),
            },
        };
        self.report(op, bundle.correlation_id(), err);
    }

    fn report(&self, op: &str, correlation_id: &CorrelationId, err: EvtrailError) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        let ex = ExError::from(err)
            .with_op(op)
            .with_correlation_id(correlation_id.clone());
        tracing::warn!(
            target: FALLBACK_TARGET,
            component = module_path!(),
            op = op,
            event = "evidence_dropped",
            err_kind = ?ex.kind(),
            err_code = ex.code(),
            correlation_id = %correlation_id,
            "evidence record dropped: {}",
            ex
        );
    }
}

impl fmt::Debug for ActionInstrumenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionInstrumenter")
            .field("registry", &self.registry)
            .field("defaults", &self.defaults)
            .field("dropped", &self.dropped_records())
            .finish_non_exhaustive()
    }
}

/// Build a bundle, replacing top-level payload fields the codec rejects
fn seal(
    correlation_id: &CorrelationId,
    event_type: EventType,
    mut payload: Map,
) -> Result<EvidenceBundle> {
    // Each retry replaces a distinct field, so this is bounded by the payload size
    for _ in 0..=payload.len() {
        match build_bundle(event_type.clone(), correlation_id, payload.clone()) {
            Err(EvtrailError::UnencodableValue { path, reason }) => {
                let field = match top_level_field(&path).map(str::to_string) {
                    Some(field) if is_replaceable(&payload, &field) => field,
                    _ => return Err(EvtrailError::UnencodableValue { path, reason }),
                };
                tracing::debug!(
                    component = module_path!(),
                    op = "evidence.seal",
                    field = %field,
                    reason = %reason,
                    "replacing unencodable payload field"
                );
                payload.insert(field, UNENCODABLE);
            }
            other => return other,
        }
    }
    build_bundle(event_type, correlation_id, payload)
}

fn is_replaceable(payload: &Map, field: &str) -> bool {
    match payload.get(field) {
        Some(value) => value.as_str() != Some(UNENCODABLE),
        None => false,
    }
}

/// `$.args.password` → `args`, `$.result[3]` → `result`
fn top_level_field(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("$.")?;
    let end = rest.find(|c| c == '.' || c == '[').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationConfig;
    use crate::instrument::record::ActionState;
    use crate::sink::MemorySink;
    use std::collections::HashMap;

    fn instrumenter() -> (ActionInstrumenter, MemorySink) {
        let sink = MemorySink::new();
        let registry = CorrelationRegistry::with_env(CorrelationConfig::default(), HashMap::new());
        (ActionInstrumenter::new(registry, sink.clone()), sink)
    }

    #[test]
    fn test_top_level_field() {
        assert_eq!(top_level_field("$.args.password"), Some("args"));
        assert_eq!(top_level_field("$.result[3]"), Some("result"));
        assert_eq!(top_level_field("$.ratio"), Some("ratio"));
        assert_eq!(top_level_field("$"), None);
    }

    #[test]
    fn test_seal_replaces_unencodable_field() {
        let cid = CorrelationId::parse("c").unwrap();
        let payload = Map::new()
            .with("action", "measure")
            .with("result", Value::Float(f64::NAN));
        let bundle = seal(&cid, EventType::TaskEnd, payload).unwrap();
        assert_eq!(
            bundle.payload().get("result"),
            Some(&Value::from(UNENCODABLE))
        );
        assert_eq!(bundle.payload().get("action"), Some(&Value::from("measure")));
    }

    #[test]
    fn test_record_states() {
        let (instr, sink) = instrumenter();
        let options = InstrumentOptions::default();
        let mut record = ActionRecord::new(&instr, "op", &options);
        assert_eq!(record.state(), ActionState::NotStarted);
        record.start(None);
        assert_eq!(record.state(), ActionState::Running);
        record.complete(None);
        assert_eq!(record.state(), ActionState::Completed);
        // Terminal transitions happen once
        record.fail("x", "x", "late");
        assert_eq!(record.state(), ActionState::Completed);
        drop(record);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_dropped_running_record_is_cancelled() {
        let (instr, sink) = instrumenter();
        let options = InstrumentOptions::default();
        {
            let mut record = ActionRecord::new(&instr, "op", &options);
            record.start(None);
        }
        let bundles = sink.bundles();
        assert_eq!(bundles.len(), 2);
        assert_eq!(
            bundles[1].payload().get("status"),
            Some(&Value::from("cancelled"))
        );
    }

    #[test]
    fn test_record_event_uses_current_correlation() {
        let (instr, sink) = instrumenter();
        instr.registry().set("session-7").unwrap();
        let bundle = instr
            .record_event(
                EventType::Decision,
                LogLevel::Info,
                Map::new().with("choice", "retry"),
            )
            .unwrap();
        assert_eq!(bundle.correlation_id().as_str(), "session-7");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_record_event_returns_codec_errors() {
        let (instr, sink) = instrumenter();
        let err = instr
            .record_event(
                EventType::Warning,
                LogLevel::Warn,
                Map::new().with("ratio", f64::INFINITY),
            )
            .unwrap_err();
        assert!(matches!(err, EvtrailError::UnencodableValue { .. }));
        assert!(sink.is_empty());
    }
}
