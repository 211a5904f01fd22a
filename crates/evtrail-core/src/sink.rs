//! Sink adapters for evidence bundles.
//!
//! The [`LogSink`] trait is the only thing the instrumenter knows about
//! where records go. Persistence and transport belong to the embedding
//! application; the adapters here cover in-process buffering, forwarding
//! into `tracing`, and newline-delimited JSON on any writer.

use crate::errors::{EvtrailError, Result};
use crate::evidence::EvidenceBundle;
use crate::instrument::LogLevel;
use evtrail_core_types::schema::FIELD_ACTION;
use evtrail_core_types::EventType;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consumer of emitted evidence bundles
pub trait LogSink: Send + Sync {
    /// Accept one bundle
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::SinkUnavailable` when the record could not be
    /// accepted. The instrumenter reports this on its fallback channel.
    fn write(&self, level: LogLevel, bundle: &EvidenceBundle) -> Result<()>;
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, level: LogLevel, bundle: &EvidenceBundle) -> Result<()> {
        (**self).write(level, bundle)
    }
}

/// In-memory sink; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<(LogLevel, EvidenceBundle)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads see everything stored, even after a writer panicked
    fn buffer(&self) -> MutexGuard<'_, Vec<(LogLevel, EvidenceBundle)>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All records with their levels, in arrival order
    pub fn records(&self) -> Vec<(LogLevel, EvidenceBundle)> {
        self.buffer().clone()
    }

    /// All bundles in arrival order
    pub fn bundles(&self) -> Vec<EvidenceBundle> {
        self.records().into_iter().map(|(_, b)| b).collect()
    }

    /// Bundles of one event type
    pub fn of_type(&self, event_type: &EventType) -> Vec<EvidenceBundle> {
        self.bundles()
            .into_iter()
            .filter(|b| b.event_type() == event_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: LogLevel, bundle: &EvidenceBundle) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| EvtrailError::SinkUnavailable {
                message: "memory sink lock poisoned".to_string(),
            })?;
        records.push((level, bundle.clone()));
        Ok(())
    }
}

/// Forwards each bundle as a `tracing` event
///
/// The full bundle is attached as a JSON string in the `bundle` field, next
/// to the canonical `component`, `op` and `event` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! emit_bundle {
    ($level:expr, $op:expr, $bundle:expr, $json:expr) => {
        tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $bundle.event_type().as_str(),
            correlation_id = $bundle.correlation_id().as_str(),
            evidence_hash = $bundle.evidence_hash(),
            bundle = $json.as_str(),
        )
    };
}

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, bundle: &EvidenceBundle) -> Result<()> {
        let json = serde_json::to_string(bundle)?;
        let op = bundle
            .payload()
            .get(FIELD_ACTION)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        match level {
            LogLevel::Trace => emit_bundle!(tracing::Level::TRACE, op, bundle, json),
            LogLevel::Debug => emit_bundle!(tracing::Level::DEBUG, op, bundle, json),
            LogLevel::Info => emit_bundle!(tracing::Level::INFO, op, bundle, json),
            LogLevel::Warn => emit_bundle!(tracing::Level::WARN, op, bundle, json),
            LogLevel::Error => emit_bundle!(tracing::Level::ERROR, op, bundle, json),
        }
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect a buffer
    ///
    /// # Errors
    ///
    /// Returns `EvtrailError::SinkUnavailable` if the lock was poisoned.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| EvtrailError::SinkUnavailable {
                message: "json-lines sink lock poisoned".to_string(),
            })
    }
}

impl<W: Write + Send> LogSink for JsonLinesSink<W> {
    fn write(&self, _level: LogLevel, bundle: &EvidenceBundle) -> Result<()> {
        let line = serde_json::to_string(bundle)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| EvtrailError::SinkUnavailable {
                message: "json-lines sink lock poisoned".to_string(),
            })?;
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| EvtrailError::SinkUnavailable {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Map;
    use crate::evidence::build_bundle;
    use evtrail_core_types::CorrelationId;

    fn bundle(event_type: EventType) -> EvidenceBundle {
        let cid = CorrelationId::parse("sink-test").unwrap();
        build_bundle(event_type, &cid, Map::new().with("action", "demo")).unwrap()
    }

    #[test]
    fn test_memory_sink_shares_buffer_between_clones() {
        let sink = MemorySink::new();
        let other = sink.clone();
        other.write(LogLevel::Info, &bundle(EventType::TaskStart)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.of_type(&EventType::TaskStart).len(), 1);
        assert!(sink.of_type(&EventType::TaskEnd).is_empty());
        sink.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_bundle() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.write(LogLevel::Info, &bundle(EventType::TaskStart)).unwrap();
        sink.write(LogLevel::Info, &bundle(EventType::TaskEnd)).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event_type"], "task_start");
        assert_eq!(first["correlation_id"], "sink-test");
        assert!(first["evidence_hash"]
            .as_str()
            .unwrap()
            .starts_with("sha256:"));
    }

    #[test]
    fn test_arc_sink_delegates() {
        let inner = MemorySink::new();
        let shared: Arc<dyn LogSink> = Arc::new(inner.clone());
        shared.write(LogLevel::Warn, &bundle(EventType::Warning)).unwrap();
        assert_eq!(inner.records()[0].0, LogLevel::Warn);
    }

    #[test]
    fn test_memory_sink_reads_survive_poisoned_lock() {
        let sink = MemorySink::new();
        let bundle = build_bundle(
            EventType::Decision,
            &CorrelationId::parse("poison").unwrap(),
            Map::new(),
        )
        .unwrap();
        sink.write(LogLevel::Info, &bundle).unwrap();

        let shared = sink.clone();
        let outcome = std::thread::spawn(move || {
            let _held = shared.records.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(sink.records.is_poisoned());

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].1.correlation_id().as_str(), "poison");
        assert!(matches!(
            sink.write(LogLevel::Info, &bundle),
            Err(EvtrailError::SinkUnavailable { .. })
        ));
        sink.clear();
        assert!(sink.is_empty());
    }
}
