//! evtrail core - correlation-tagged, tamper-evident evidence records
//!
//! This crate provides:
//! - A deterministic canonical JSON codec (RFC 8785 / JCS)
//! - SHA-256 content hashing and evidence bundle construction
//! - A correlation registry with thread, task and subprocess propagation
//! - An action instrumenter emitting start/end/error bundles around work
//! - Sink adapters, the error facility, logging and TOML configuration
//!
//! ```
//! use evtrail_core::{ActionInstrumenter, CorrelationRegistry, MemorySink};
//!
//! let sink = MemorySink::new();
//! let instrumenter = ActionInstrumenter::new(CorrelationRegistry::default(), sink.clone());
//!
//! let sum: Result<u32, String> = instrumenter.call("add", &(2, 3), || Ok(5));
//! assert_eq!(sum, Ok(5));
//! assert_eq!(sink.len(), 2);
//! ```

pub mod canonical;
pub mod config;
pub mod correlation;
pub mod errors;
pub mod evidence;
pub mod instrument;
pub mod logging_facility;
pub mod sink;

// Re-export commonly used types
pub use canonical::{encode, encode_to_string, Map, Value};
pub use config::EvtrailConfig;
pub use correlation::{CorrelationConfig, CorrelationRegistry, CorrelationSnapshot, ScopeGuard};
pub use errors::{EvtrailError, ExError, ExErrorKind, Result};
pub use evidence::{build_bundle, build_bundle_at, hash, EvidenceBundle};
pub use evtrail_core_types::{CorrelationId, EventType, Sensitive};
pub use instrument::{ActionInstrumenter, InstrumentOptions, LogLevel};
pub use sink::{JsonLinesSink, LogSink, MemorySink, TracingSink};
