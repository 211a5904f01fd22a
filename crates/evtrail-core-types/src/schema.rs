//! Canonical schema constants for structured logging and evidence bundles
//!
//! These constants keep field names consistent between emitted bundles,
//! tracing events and tests.

// Bundle envelope fields
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_EVENT_TYPE: &str = "event_type";
pub const FIELD_CORRELATION_ID: &str = "correlation_id";
pub const FIELD_EVIDENCE_HASH: &str = "evidence_hash";

/// Envelope fields a payload may not override
pub const RESERVED_FIELDS: [&str; 4] = [
    FIELD_TIMESTAMP,
    FIELD_EVENT_TYPE,
    FIELD_CORRELATION_ID,
    FIELD_EVIDENCE_HASH,
];

/// Prefix of every `evidence_hash` value
pub const HASH_PREFIX: &str = "sha256:";

// Action payload fields
pub const FIELD_ACTION: &str = "action";
pub const FIELD_ARGS: &str = "args";
pub const FIELD_RESULT: &str = "result";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_ERROR_KIND: &str = "error_kind";
pub const FIELD_ERROR_TYPE: &str = "error_type";
pub const FIELD_ERROR_MESSAGE: &str = "error_message";

// Tracing fields
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Terminal statuses
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Placeholder written in place of masked values
pub const REDACTED: &str = "***REDACTED***";
