use evtrail_core_types::CorrelationId;
use thiserror::Error;

/// Result type alias using EvtrailError
pub type Result<T> = std::result::Result<T, EvtrailError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in fallback diagnostics,
/// tests and any external surface that reports instrumentation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Correlation
    InvalidCorrelationId,

    // Canonicalization / hashing
    UnencodableValue,
    ReservedField,

    // Sink plumbing
    SinkUnavailable,

    // Integration
    Serialization,
    Config,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidCorrelationId => "ERR_INVALID_CORRELATION_ID",
            ExErrorKind::UnencodableValue => "ERR_UNENCODABLE_VALUE",
            ExErrorKind::ReservedField => "ERR_RESERVED_FIELD",
            ExErrorKind::SinkUnavailable => "ERR_SINK_UNAVAILABLE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification of an error plus the context needed to
/// report it on the fallback diagnostic channel.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    field: Option<String>,
    correlation_id: Option<CorrelationId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            field: None,
            correlation_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the offending field or path
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add correlation context
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the offending field or path, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the correlation context, if any
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        if let Some(correlation_id) = &self.correlation_id {
            write!(f, " (correlation_id: {})", correlation_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for evtrail operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvtrailError {
    /// Correlation id was empty or whitespace-only
    #[error("Invalid correlation id: {reason}")]
    InvalidCorrelationId { reason: String },

    /// Value cannot be canonicalized (NaN, infinity, unrepresentable type)
    #[error("Unencodable value at {path}: {reason}")]
    UnencodableValue { path: String, reason: String },

    /// Payload tried to override an envelope field
    #[error("Payload field '{field}' is reserved by the bundle envelope")]
    ReservedField { field: String },

    /// Sink rejected or failed to accept a record
    #[error("Sink unavailable: {message}")]
    SinkUnavailable { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration could not be parsed
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EvtrailError {
    pub(crate) fn unencodable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EvtrailError::UnencodableValue {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Conversion from EvtrailError to ExError
impl From<EvtrailError> for ExError {
    fn from(err: EvtrailError) -> Self {
        match err {
            EvtrailError::InvalidCorrelationId { reason } => {
                ExError::new(ExErrorKind::InvalidCorrelationId).with_message(reason)
            }
            EvtrailError::UnencodableValue { path, reason } => {
                ExError::new(ExErrorKind::UnencodableValue)
                    .with_field(path)
                    .with_message(reason)
            }
            EvtrailError::ReservedField { field } => ExError::new(ExErrorKind::ReservedField)
                .with_field(field)
                .with_message("Payload field is reserved by the bundle envelope"),
            EvtrailError::SinkUnavailable { message } => {
                ExError::new(ExErrorKind::SinkUnavailable).with_message(message)
            }
            EvtrailError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            EvtrailError::Config { message } => {
                ExError::new(ExErrorKind::Config).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for EvtrailError {
    fn from(err: serde_json::Error) -> Self {
        EvtrailError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EvtrailError {
    fn from(err: toml::de::Error) -> Self {
        EvtrailError::Config {
            message: err.to_string(),
        }
    }
}
